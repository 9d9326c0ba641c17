use crate::effects::filter::{ClearMode, Filter, FilterContext, FilterOutput, FilterShader};
use crate::foundation::core::{Point, Rect, Vec2};
use crate::foundation::error::FxResult;
use crate::render::device::TexelSampler;
use crate::render::globals::FilterGlobals;
use crate::render::surface_pool::SurfaceView;

#[derive(Clone, Debug)]
struct OffsetShader {
    offset: Vec2,
}

impl FilterShader for OffsetShader {
    fn label(&self) -> &str {
        "offset"
    }

    fn fragment(&self, input: &TexelSampler<'_>, uv: Point, globals: &FilterGlobals) -> [f32; 4] {
        let at = Point::new(
            uv.x - self.offset.x * globals.input_size[2],
            uv.y - self.offset.y * globals.input_size[3],
        );
        let c = globals.input_clamp;
        if at.x < c[0] || at.y < c[1] || at.x > c[2] || at.y > c[3] {
            return [0.0; 4];
        }
        input.sample(at)
    }
}

/// Moves the subtree by a fixed logical offset (e.g. a drop-shadow displacement).
///
/// Unlike most units this one reports frames that do not contain their input.
#[derive(Clone, Debug)]
pub struct OffsetFilter {
    shader: OffsetShader,
    auto_fit: bool,
    enabled: bool,
}

impl OffsetFilter {
    /// Shift by `(dx, dy)` logical units.
    pub fn new(dx: f64, dy: f64) -> Self {
        Self {
            shader: OffsetShader {
                offset: Vec2::new(dx, dy),
            },
            auto_fit: true,
            enabled: true,
        }
    }

    /// Opt out of clipping to the visible area.
    pub fn with_auto_fit(mut self, auto_fit: bool) -> Self {
        self.auto_fit = auto_fit;
        self
    }

    /// Enable or disable the unit.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Displacement in logical units.
    pub fn offset(&self) -> Vec2 {
        self.shader.offset
    }
}

impl Filter for OffsetFilter {
    fn name(&self) -> &str {
        "offset"
    }

    fn auto_fit(&self) -> bool {
        self.auto_fit
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn measure_output(&self, input: Rect) -> Rect {
        input + self.shader.offset
    }

    fn measure_input(&self, output: Rect) -> Rect {
        output - self.shader.offset
    }

    fn apply(
        &self,
        ctx: &mut dyn FilterContext,
        input: SurfaceView,
        output: FilterOutput,
        clear: ClearMode,
    ) -> FxResult<()> {
        ctx.apply_filter(&self.shader, self.draw_state(), input, output, clear)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/offset.rs"]
mod tests;
