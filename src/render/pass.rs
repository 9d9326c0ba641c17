use crate::effects::filter::{Filter, InputSource};
use crate::foundation::core::{Rect, contains_frame, enlarge_to_contain, fit, is_degenerate};
use smallvec::SmallVec;
use std::sync::Arc;

/// Measured frames for one stage of a filter chain.
///
/// All rectangles are in the logical coordinate space of the filtered subtree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PassDescriptor {
    /// Padded bounds of the filtered subtree.
    pub target_bounds: Rect,
    /// Region of the previous stage's surface holding valid input.
    pub input_frame: Rect,
    /// Region of this stage's surface holding valid output.
    pub output_frame: Rect,
    /// Sub-region this unit actually reads.
    pub target_in_frame: Rect,
    /// Sub-region this unit actually writes.
    pub target_out_frame: Rect,
}

impl PassDescriptor {
    /// `true` when the unit would read or write nothing.
    pub fn is_degenerate(&self) -> bool {
        is_degenerate(self.target_in_frame) || is_degenerate(self.target_out_frame)
    }

    /// Frame containment invariant: output holds target-out, input holds target-in.
    pub fn is_contained(&self) -> bool {
        contains_frame(self.output_frame, self.target_out_frame)
            && contains_frame(self.input_frame, self.target_in_frame)
    }
}

/// Per-stage descriptors of one chain.
pub type PassList = SmallVec<[PassDescriptor; 4]>;

/// Walk the chain in order, asking each unit where it reads and writes.
///
/// Running frames only ever grow: each stage's frames contain the previous stage's output and
/// the unit's own target frame.
pub fn measure_forward(filters: &[Arc<dyn Filter>], target_bounds: Rect) -> PassList {
    let mut passes = PassList::with_capacity(filters.len());
    let mut prev_out = target_bounds;
    for f in filters {
        let target_in_frame = match f.input_source() {
            InputSource::Upstream => prev_out,
            InputSource::TargetBounds => target_bounds,
        };
        let target_out_frame = f.measure_output(target_in_frame);
        let input_frame = enlarge_to_contain(prev_out, target_in_frame);
        let output_frame = enlarge_to_contain(prev_out, target_out_frame);
        passes.push(PassDescriptor {
            target_bounds,
            input_frame,
            output_frame,
            target_in_frame,
            target_out_frame,
        });
        prev_out = output_frame;
    }
    passes
}

/// Clip the chain's final output to `visible` and re-derive every stage back to front.
///
/// Returns `false` without touching `passes` when clipping changes nothing.
pub fn fit_backward(filters: &[Arc<dyn Filter>], passes: &mut [PassDescriptor], visible: Rect) -> bool {
    let Some(last) = passes.last() else {
        return false;
    };
    let clipped = fit(last.output_frame, visible);
    if clipped == last.output_frame {
        return false;
    }

    let mut needed = clipped;
    for (f, p) in filters.iter().zip(passes.iter_mut()).rev() {
        p.output_frame = fit(p.output_frame, needed);
        p.target_out_frame = fit(p.target_out_frame, p.output_frame);
        p.target_in_frame = fit(f.measure_input(p.target_out_frame), p.target_in_frame);
        p.input_frame = enlarge_to_contain(fit(p.input_frame, p.output_frame), p.target_in_frame);
        needed = p.input_frame;
    }
    true
}

/// Index of the first stage with nothing to read or write.
pub fn first_degenerate(passes: &[PassDescriptor]) -> Option<usize> {
    passes.iter().position(PassDescriptor::is_degenerate)
}

/// Smallest frame covering every stage; this is what the pass surface is sized for.
pub fn union_frame(passes: &[PassDescriptor]) -> Rect {
    passes.iter().fold(Rect::ZERO, |acc, p| {
        enlarge_to_contain(enlarge_to_contain(acc, p.input_frame), p.output_frame)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/pass.rs"]
mod tests;
