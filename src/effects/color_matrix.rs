use crate::effects::filter::{ClearMode, Filter, FilterContext, FilterOutput, FilterShader};
use crate::foundation::core::Point;
use crate::foundation::error::{FxError, FxResult};
use crate::render::device::TexelSampler;
use crate::render::globals::FilterGlobals;
use crate::render::surface_pool::SurfaceView;

/// Row-major 4x5 matrix over straight-alpha RGBA; the fifth column is an offset in `[0, 1]`.
pub type ColorMatrix = [f32; 20];

const IDENTITY: ColorMatrix = [
    1.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, 0.0,
];

#[derive(Clone, Debug)]
struct ColorMatrixShader {
    matrix: ColorMatrix,
}

impl FilterShader for ColorMatrixShader {
    fn label(&self) -> &str {
        "color_matrix"
    }

    fn fragment(&self, input: &TexelSampler<'_>, uv: Point, globals: &FilterGlobals) -> [f32; 4] {
        let px = input.sample_clamped(uv, globals.input_clamp);
        let a = px[3];
        let straight = if a > 0.0 {
            [px[0] / a, px[1] / a, px[2] / a, a]
        } else {
            [0.0; 4]
        };

        let m = &self.matrix;
        let mut out = [0.0f32; 4];
        for (row, o) in out.iter_mut().enumerate() {
            let r = &m[row * 5..row * 5 + 5];
            *o = (r[0] * straight[0]
                + r[1] * straight[1]
                + r[2] * straight[2]
                + r[3] * straight[3]
                + r[4])
                .clamp(0.0, 1.0);
        }
        let a = out[3];
        [out[0] * a, out[1] * a, out[2] * a, a]
    }
}

/// Applies a 4x5 color matrix in one pass.
#[derive(Clone, Debug)]
pub struct ColorMatrixFilter {
    shader: ColorMatrixShader,
    resolution: f64,
    enabled: bool,
}

impl ColorMatrixFilter {
    /// Use an explicit matrix. Every entry must be finite.
    pub fn new(matrix: ColorMatrix) -> FxResult<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(FxError::validation("color matrix entries must be finite"));
        }
        Ok(Self {
            shader: ColorMatrixShader { matrix },
            resolution: 1.0,
            enabled: true,
        })
    }

    /// Leaves colors untouched.
    pub fn identity() -> Self {
        Self::from_trusted(IDENTITY)
    }

    /// Rec. 709 luma grayscale.
    pub fn grayscale() -> Self {
        let (r, g, b) = (0.2126, 0.7152, 0.0722);
        Self::from_trusted([
            r, g, b, 0.0, 0.0, //
            r, g, b, 0.0, 0.0, //
            r, g, b, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ])
    }

    /// Scale color channels by `amount` (`1.0` is unchanged).
    pub fn brightness(amount: f32) -> FxResult<Self> {
        let mut m = IDENTITY;
        m[0] = amount;
        m[6] = amount;
        m[12] = amount;
        Self::new(m)
    }

    /// Invert color channels.
    pub fn invert() -> Self {
        Self::from_trusted([
            -1.0, 0.0, 0.0, 0.0, 1.0, //
            0.0, -1.0, 0.0, 0.0, 1.0, //
            0.0, 0.0, -1.0, 0.0, 1.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ])
    }

    fn from_trusted(matrix: ColorMatrix) -> Self {
        Self {
            shader: ColorMatrixShader { matrix },
            resolution: 1.0,
            enabled: true,
        }
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

    /// The matrix applied.
    pub fn matrix(&self) -> &ColorMatrix {
        &self.shader.matrix
    }
}

impl Filter for ColorMatrixFilter {
    fn name(&self) -> &str {
        "color_matrix"
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
#[path = "../../tests/unit/effects/color_matrix.rs"]
mod tests;
