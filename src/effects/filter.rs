//! Filter unit contract and the callbacks a unit may use while it is applied.

use crate::foundation::core::{Affine, Point, Rect, Size, Vec2};
use crate::foundation::error::FxResult;
use crate::render::device::TexelSampler;
use crate::render::globals::FilterGlobals;
use crate::render::pass::PassDescriptor;
use crate::render::surface_pool::{Surface, SurfaceView};

/// How a pass treats the existing contents of its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearMode {
    /// Draw onto existing contents.
    Blend,
    /// Clear to transparent before drawing.
    #[default]
    Clear,
    /// Clear only when the draw state blends or the pipeline forces clears.
    Blit,
}

impl From<bool> for ClearMode {
    /// Legacy boolean clear flag: `true` clears, `false` blends.
    fn from(clear: bool) -> Self {
        if clear { Self::Clear } else { Self::Blend }
    }
}

/// Blend equation for a filter draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Premultiplied source-over.
    #[default]
    Normal,
    /// Saturating additive.
    Add,
}

/// Draw state a filter declares for its quad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DrawState {
    /// Blend with the destination; when `false` the quad replaces it.
    pub blend: bool,
    /// Equation used while blending.
    pub blend_mode: BlendMode,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            blend: true,
            blend_mode: BlendMode::Normal,
        }
    }
}

/// Where a unit reads its input region from during measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InputSource {
    /// The previous stage's output frame.
    #[default]
    Upstream,
    /// The padded bounds of the filtered subtree, ignoring upstream growth.
    TargetBounds,
}

/// Destination handed to [`Filter::apply`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOutput {
    /// Whatever was bound before the enclosing `push`.
    Enclosing,
    /// A pooled surface.
    Surface(SurfaceView),
}

/// Fragment program of a filter.
///
/// Devices that rasterize on the CPU call [`FilterShader::fragment`] once per covered pixel.
pub trait FilterShader {
    /// Stable identity of the program source, used for program cache keys.
    fn label(&self) -> &str;

    /// Shade one fragment. Returns premultiplied RGBA in `[0, 1]`.
    fn fragment(&self, input: &TexelSampler<'_>, uv: Point, globals: &FilterGlobals) -> [f32; 4];
}

/// An image-processing unit in a filter chain.
///
/// The pipeline only ever talks to units through this trait.
pub trait Filter {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Resolution multiplier for this unit's surfaces.
    fn resolution(&self) -> f64 {
        1.0
    }

    /// Bleed added around the target bounds.
    fn padding(&self) -> f64 {
        0.0
    }

    /// Sample count wanted for the pass surface.
    fn multisample(&self) -> u8 {
        1
    }

    /// Whether the chain may clip this unit's frames to the visible area.
    fn auto_fit(&self) -> bool {
        true
    }

    /// Whether the unit expects the absolute-coordinate parameter block.
    fn legacy(&self) -> bool {
        false
    }

    /// Disabled units are skipped at push time.
    fn enabled(&self) -> bool {
        true
    }

    /// Blend state for the unit's quad.
    fn draw_state(&self) -> DrawState {
        DrawState::default()
    }

    /// Region the unit reads from during measurement.
    fn input_source(&self) -> InputSource {
        InputSource::Upstream
    }

    /// Output frame produced from `input`.
    fn measure_output(&self, input: Rect) -> Rect {
        input
    }

    /// Input frame needed to produce `output`.
    fn measure_input(&self, output: Rect) -> Rect {
        output
    }

    /// Run the unit once, reading `input` and writing `output`.
    ///
    /// Single-pass units forward to [`FilterContext::apply_filter`]; multi-draw units may request
    /// scratch surfaces through the context.
    fn apply(
        &self,
        ctx: &mut dyn FilterContext,
        input: SurfaceView,
        output: FilterOutput,
        clear: ClearMode,
    ) -> FxResult<()>;
}

/// Pipeline services available to a unit inside [`Filter::apply`].
pub trait FilterContext {
    /// Bind `output`, clear per `clear`, and draw one quad with `shader` sampling `input`.
    fn apply_filter(
        &mut self,
        shader: &dyn FilterShader,
        state: DrawState,
        input: SurfaceView,
        output: FilterOutput,
        clear: ClearMode,
    ) -> FxResult<()>;

    /// [`FilterContext::apply_filter`] taking the old boolean clear flag.
    ///
    /// Emits a deprecation notice once per pipeline.
    fn apply_filter_legacy(
        &mut self,
        shader: &dyn FilterShader,
        state: DrawState,
        input: SurfaceView,
        output: FilterOutput,
        clear: bool,
    ) -> FxResult<()>;

    /// Bind `output` as the destination and clear it per `clear`.
    fn bind_and_clear(&mut self, output: FilterOutput, clear: ClearMode) -> FxResult<()>;

    /// Borrow a scratch surface sized like `reference`.
    fn get_filter_texture(
        &mut self,
        reference: SurfaceView,
        resolution: Option<f64>,
        samples: Option<u8>,
    ) -> FxResult<Surface>;

    /// Hand a scratch surface back to the pool.
    fn return_filter_texture(&mut self, surface: Surface) -> FxResult<()>;

    /// Frames of the pass being applied, if any.
    fn active_pass(&self) -> Option<&PassDescriptor>;

    /// Per-pass parameter block of the pass being applied.
    fn globals(&self) -> &FilterGlobals;

    /// Map the active pass's normalized output space onto a sprite's texture space.
    fn calculate_sprite_matrix(
        &self,
        world_transform: Affine,
        texture_size: Size,
        anchor: Vec2,
    ) -> Affine;
}

#[cfg(test)]
#[path = "../../tests/unit/effects/filter.rs"]
mod tests;
