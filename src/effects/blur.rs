use crate::effects::filter::{ClearMode, Filter, FilterContext, FilterOutput, FilterShader};
use crate::foundation::core::{Point, Rect, Vec2};
use crate::foundation::error::{FxError, FxResult};
use crate::render::device::TexelSampler;
use crate::render::globals::FilterGlobals;
use crate::render::surface_pool::SurfaceView;

/// Largest supported blur radius in logical units.
pub const MAX_BLUR_RADIUS: u32 = 256;

/// Direction of a separable blur pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurAxis {
    /// Horizontal.
    X,
    /// Vertical.
    Y,
}

/// Normalized Gaussian weights for taps `-radius..=radius`.
pub fn gaussian_kernel(radius: u32, sigma: f32) -> FxResult<Vec<f32>> {
    if radius == 0 {
        return Ok(vec![1.0]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FxError::validation("blur sigma must be finite and > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(FxError::validation("gaussian kernel sum is zero"));
    }
    Ok(weights.into_iter().map(|w| (w / sum) as f32).collect())
}

#[derive(Clone, Debug)]
struct BlurShader {
    axis: BlurAxis,
    label: String,
    weights: Vec<f32>,
}

impl BlurShader {
    fn new(axis: BlurAxis, radius: u32, sigma: f32) -> FxResult<Self> {
        let weights = gaussian_kernel(radius, sigma)?;
        let dir = match axis {
            BlurAxis::X => "x",
            BlurAxis::Y => "y",
        };
        Ok(Self {
            axis,
            label: format!("blur.{dir}.taps{}", weights.len()),
            weights,
        })
    }
}

impl FilterShader for BlurShader {
    fn label(&self) -> &str {
        &self.label
    }

    fn fragment(&self, input: &TexelSampler<'_>, uv: Point, globals: &FilterGlobals) -> [f32; 4] {
        // One tap per logical unit.
        let step = match self.axis {
            BlurAxis::X => Vec2::new(globals.input_size[2], 0.0),
            BlurAxis::Y => Vec2::new(0.0, globals.input_size[3]),
        };
        let r = (self.weights.len() / 2) as f64;
        let mut acc = [0.0f32; 4];
        for (i, &w) in self.weights.iter().enumerate() {
            let at = uv + step * (i as f64 - r);
            let px = input.sample_clamped(at, globals.input_clamp);
            for c in 0..4 {
                acc[c] += w * px[c];
            }
        }
        acc
    }
}

fn validate_radius(radius: u32) -> FxResult<()> {
    if radius > MAX_BLUR_RADIUS {
        return Err(FxError::validation(format!(
            "blur radius must be <= {MAX_BLUR_RADIUS}, got {radius}"
        )));
    }
    Ok(())
}

fn inflate_axis(r: Rect, axis: BlurAxis, by: f64) -> Rect {
    match axis {
        BlurAxis::X => Rect::new(r.x0 - by, r.y0, r.x1 + by, r.y1),
        BlurAxis::Y => Rect::new(r.x0, r.y0 - by, r.x1, r.y1 + by),
    }
}

/// One direction of a Gaussian blur.
///
/// Output bleeds `radius` units along the axis, so the measured output frame grows by that much.
#[derive(Clone, Debug)]
pub struct BlurPassFilter {
    radius: u32,
    sigma: f32,
    padding: Option<f64>,
    resolution: f64,
    enabled: bool,
    shader: BlurShader,
}

impl BlurPassFilter {
    /// Blur along `axis`. `sigma` defaults to half the radius.
    pub fn new(axis: BlurAxis, radius: u32, sigma: Option<f32>) -> FxResult<Self> {
        validate_radius(radius)?;
        let sigma = sigma.unwrap_or((radius as f32) / 2.0);
        Ok(Self {
            radius,
            sigma,
            padding: None,
            resolution: 1.0,
            enabled: true,
            shader: BlurShader::new(axis, radius, sigma)?,
        })
    }

    /// Horizontal blur with the default sigma.
    pub fn blur_x(radius: u32) -> FxResult<Self> {
        Self::new(BlurAxis::X, radius, None)
    }

    /// Vertical blur with the default sigma.
    pub fn blur_y(radius: u32) -> FxResult<Self> {
        Self::new(BlurAxis::Y, radius, None)
    }

    /// Override the padding, which otherwise equals the radius.
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = Some(padding.max(0.0));
        self
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

    /// Blur direction.
    pub fn axis(&self) -> BlurAxis {
        self.shader.axis
    }

    /// Radius in logical units.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Gaussian standard deviation.
    pub fn sigma(&self) -> f32 {
        self.sigma
    }
}

impl Filter for BlurPassFilter {
    fn name(&self) -> &str {
        match self.shader.axis {
            BlurAxis::X => "blur_x",
            BlurAxis::Y => "blur_y",
        }
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn padding(&self) -> f64 {
        self.padding.unwrap_or(f64::from(self.radius))
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn measure_output(&self, input: Rect) -> Rect {
        inflate_axis(input, self.shader.axis, f64::from(self.radius))
    }

    fn measure_input(&self, output: Rect) -> Rect {
        inflate_axis(output, self.shader.axis, f64::from(self.radius))
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

/// Two-direction Gaussian blur run as one unit.
///
/// `apply` draws the horizontal pass into a scratch surface borrowed from the pipeline, then the
/// vertical pass into the real output.
#[derive(Clone, Debug)]
pub struct BlurFilter {
    x: BlurPassFilter,
    y: BlurPassFilter,
    padding: Option<f64>,
    enabled: bool,
}

impl BlurFilter {
    /// Blur both axes by `radius`. `sigma` defaults to half the radius.
    pub fn new(radius: u32, sigma: Option<f32>) -> FxResult<Self> {
        Ok(Self {
            x: BlurPassFilter::new(BlurAxis::X, radius, sigma)?,
            y: BlurPassFilter::new(BlurAxis::Y, radius, sigma)?,
            padding: None,
            enabled: true,
        })
    }

    /// Override the padding, which otherwise equals the radius.
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = Some(padding.max(0.0));
        self
    }

    /// Run at a different resolution.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.x.resolution = resolution;
        self.y.resolution = resolution;
        self
    }

    /// Enable or disable the unit.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Filter for BlurFilter {
    fn name(&self) -> &str {
        "blur"
    }

    fn resolution(&self) -> f64 {
        self.x.resolution
    }

    fn padding(&self) -> f64 {
        self.padding.unwrap_or_else(|| self.x.padding())
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn measure_output(&self, input: Rect) -> Rect {
        self.y.measure_output(self.x.measure_output(input))
    }

    fn measure_input(&self, output: Rect) -> Rect {
        self.x.measure_input(self.y.measure_input(output))
    }

    fn apply(
        &self,
        ctx: &mut dyn FilterContext,
        input: SurfaceView,
        output: FilterOutput,
        clear: ClearMode,
    ) -> FxResult<()> {
        let scratch = ctx.get_filter_texture(input, None, Some(1))?;
        let view = scratch.view();
        let state = self.draw_state();
        let drawn = ctx
            .apply_filter(&self.x.shader, state, input, FilterOutput::Surface(view), ClearMode::Clear)
            .and_then(|()| ctx.apply_filter(&self.y.shader, state, view, output, clear));
        let returned = ctx.return_filter_texture(scratch);
        drawn.and(returned)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
