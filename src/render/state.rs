use crate::effects::filter::Filter;
use crate::foundation::core::Rect;
use crate::render::device::Binding;
use crate::render::pass::PassList;
use crate::render::surface_pool::Surface;
use smallvec::SmallVec;
use std::sync::Arc;

/// How padding combines across a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingPolicy {
    /// Largest padding of any unit.
    #[default]
    Max,
    /// Sum of every unit's padding.
    Sum,
}

/// How `auto_fit` combines across a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFitPolicy {
    /// Fit only when every unit opts in.
    #[default]
    All,
    /// Fit when any unit opts in.
    Any,
}

/// Everything one push/pop needs to remember.
#[derive(Default)]
pub(crate) struct FilterState {
    pub(crate) filters: SmallVec<[Arc<dyn Filter>; 4]>,
    pub(crate) passes: PassList,
    pub(crate) target_bounds: Rect,
    pub(crate) frame: Rect,
    pub(crate) resolution: f64,
    pub(crate) padding: f64,
    pub(crate) multisample: u8,
    pub(crate) auto_fit: bool,
    pub(crate) legacy: bool,
    /// Pass surface holding the drawn subtree; `None` when the chain collapsed to nothing.
    pub(crate) surface: Option<Surface>,
    /// Destination bound before the push; the chain's final output lands here.
    pub(crate) enclosing: Binding,
}

impl FilterState {
    /// Combine per-unit settings: lowest resolution and sample count, padding per `padding`,
    /// `auto_fit` per `auto_fit`, `legacy` if any unit needs it.
    pub(crate) fn resolve_chain(&mut self, padding: PaddingPolicy, auto_fit: AutoFitPolicy) {
        let mut it = self.filters.iter();
        let Some(first) = it.next() else {
            return;
        };
        let mut resolution = first.resolution();
        let mut multisample = first.multisample().max(1);
        let mut pad = first.padding().max(0.0);
        let mut fit = first.auto_fit();
        let mut legacy = first.legacy();
        for f in it {
            resolution = resolution.min(f.resolution());
            multisample = multisample.min(f.multisample().max(1));
            pad = match padding {
                PaddingPolicy::Max => pad.max(f.padding()),
                PaddingPolicy::Sum => pad + f.padding().max(0.0),
            };
            fit = match auto_fit {
                AutoFitPolicy::All => fit && f.auto_fit(),
                AutoFitPolicy::Any => fit || f.auto_fit(),
            };
            legacy = legacy || f.legacy();
        }
        self.resolution = resolution;
        self.multisample = multisample;
        self.padding = pad;
        self.auto_fit = fit;
        self.legacy = legacy;
    }

    /// Drop every reference so a parked record pins no filter or surface.
    pub(crate) fn reset(&mut self) {
        self.filters.clear();
        self.passes.clear();
        self.target_bounds = Rect::ZERO;
        self.frame = Rect::ZERO;
        self.resolution = 1.0;
        self.padding = 0.0;
        self.multisample = 1;
        self.auto_fit = false;
        self.legacy = false;
        self.surface = None;
        self.enclosing = Binding::default();
    }
}

/// Reusable filter-state records addressed by index, with a free list.
///
/// Slot 0 is the sentinel standing for the host surface and is never recycled.
pub(crate) struct StateArena {
    slots: Vec<FilterState>,
    free: Vec<usize>,
}

impl StateArena {
    pub(crate) const SENTINEL: usize = 0;

    pub(crate) fn new(root: Binding) -> Self {
        let mut sentinel = FilterState::default();
        sentinel.reset();
        sentinel.enclosing = root;
        Self {
            slots: vec![sentinel],
            free: Vec::new(),
        }
    }

    /// Take a free record out of the arena. Its storage keeps any capacity from earlier use.
    pub(crate) fn acquire(&mut self) -> (usize, FilterState) {
        if let Some(i) = self.free.pop() {
            return (i, std::mem::take(&mut self.slots[i]));
        }
        self.slots.push(FilterState::default());
        let i = self.slots.len() - 1;
        let mut state = std::mem::take(&mut self.slots[i]);
        state.reset();
        (i, state)
    }

    /// Store a live record back in its slot.
    pub(crate) fn park(&mut self, i: usize, state: FilterState) {
        self.slots[i] = state;
    }

    /// Take a live record out of its slot for processing.
    pub(crate) fn take(&mut self, i: usize) -> FilterState {
        std::mem::take(&mut self.slots[i])
    }

    /// Reset a record and put it on the free list.
    pub(crate) fn recycle(&mut self, i: usize, mut state: FilterState) {
        state.reset();
        self.slots[i] = state;
        if i != Self::SENTINEL {
            self.free.push(i);
        }
    }

    pub(crate) fn get(&self, i: usize) -> &FilterState {
        &self.slots[i]
    }

    /// Number of records ever allocated, sentinel included.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Forget every pooled record except the sentinel.
    pub(crate) fn shrink(&mut self) {
        self.slots.truncate(1);
        self.free.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/state.rs"]
mod tests;
