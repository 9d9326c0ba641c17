use crate::effects::filter::{ClearMode, Filter, FilterContext, FilterOutput, FilterShader};
use crate::foundation::core::Point;
use crate::foundation::error::{FxError, FxResult};
use crate::render::device::TexelSampler;
use crate::render::globals::FilterGlobals;
use crate::render::surface_pool::SurfaceView;

#[derive(Clone, Debug)]
struct AlphaShader {
    alpha: f32,
}

impl FilterShader for AlphaShader {
    fn label(&self) -> &str {
        "alpha"
    }

    fn fragment(&self, input: &TexelSampler<'_>, uv: Point, globals: &FilterGlobals) -> [f32; 4] {
        input
            .sample_clamped(uv, globals.input_clamp)
            .map(|c| c * self.alpha)
    }
}

/// Multiplies the whole subtree by a constant opacity.
#[derive(Clone, Debug)]
pub struct AlphaFilter {
    shader: AlphaShader,
    resolution: f64,
    enabled: bool,
}

impl AlphaFilter {
    /// Opacity in `[0, 1]`.
    pub fn new(alpha: f32) -> FxResult<Self> {
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return Err(FxError::validation(format!(
                "alpha must be within [0, 1], got {alpha}"
            )));
        }
        Ok(Self {
            shader: AlphaShader { alpha },
            resolution: 1.0,
            enabled: true,
        })
    }

    /// Run at a different resolution.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Enable or disable the unit.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Opacity applied.
    pub fn alpha(&self) -> f32 {
        self.shader.alpha
    }
}

impl Filter for AlphaFilter {
    fn name(&self) -> &str {
        "alpha"
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn enabled(&self) -> bool {
        self.enabled
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
#[path = "../../tests/unit/effects/alpha.rs"]
mod tests;
