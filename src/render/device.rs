use crate::effects::filter::{DrawState, FilterShader};
use crate::foundation::core::{Point, Rect};
use crate::foundation::error::FxResult;
use crate::render::globals::FilterGlobals;
use crate::render::program::ProgramKey;

/// Device-side handle of an off-screen color surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// Something a device can draw into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The host surface (bottom of the filter stack).
    Screen,
    /// An off-screen surface.
    Surface(SurfaceId),
}

/// Active render destination plus its projection.
///
/// `source_frame` is the logical region that maps onto `dest_frame`, which is expressed in
/// physical pixels of the target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Binding {
    /// Destination being drawn into.
    pub target: RenderTarget,
    /// Logical region visible through this binding.
    pub source_frame: Rect,
    /// Pixel rectangle of the target that `source_frame` maps onto.
    pub dest_frame: Rect,
}

impl Binding {
    /// Physical pixels per logical unit along x (falls back to `1.0` for empty frames).
    pub fn resolution(&self) -> f64 {
        let w = self.source_frame.width();
        if w > 0.0 {
            self.dest_frame.width() / w
        } else {
            1.0
        }
    }
}

impl Default for Binding {
    fn default() -> Self {
        Self {
            target: RenderTarget::Screen,
            source_frame: Rect::ZERO,
            dest_frame: Rect::ZERO,
        }
    }
}

/// Read-only view of a premultiplied RGBA8 source surface for CPU fragment programs.
///
/// Sampling is nearest-texel with coordinates clamped to the surface edge.
pub struct TexelSampler<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> TexelSampler<'a> {
    /// Wrap tightly packed RGBA8 bytes of a `width x height` surface.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at integer pixel coordinates, clamped to the edge.
    pub fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        let idx = (y * self.width as usize + x) * 4;
        match self.data.get(idx..idx + 4) {
            Some(px) => [
                f32::from(px[0]) / 255.0,
                f32::from(px[1]) / 255.0,
                f32::from(px[2]) / 255.0,
                f32::from(px[3]) / 255.0,
            ],
            None => [0.0; 4],
        }
    }

    /// Nearest texel for normalized coordinates.
    pub fn sample(&self, uv: Point) -> [f32; 4] {
        let x = (uv.x * f64::from(self.width)).floor() as i64;
        let y = (uv.y * f64::from(self.height)).floor() as i64;
        self.texel(x, y)
    }

    /// Nearest texel after clamping `uv` into `[x0, y0, x1, y1]`.
    pub fn sample_clamped(&self, uv: Point, clamp: [f64; 4]) -> [f32; 4] {
        let u = uv.x.max(clamp[0]).min(clamp[2]);
        let v = uv.y.max(clamp[1]).min(clamp[3]);
        self.sample(Point::new(u, v))
    }
}

/// Axis-aligned quad drawn for one filter pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterQuad {
    /// Corners in the bound target's logical space.
    pub positions: Rect,
    /// Matching corners in the source surface's normalized texture space.
    pub uvs: Rect,
}

/// One filter draw request handed to the device.
pub struct FilterDraw<'a> {
    /// Fragment program to run.
    pub shader: &'a dyn FilterShader,
    /// Blend state declared by the filter.
    pub state: DrawState,
    /// Surface sampled by the shader.
    pub source: SurfaceId,
    /// Geometry to rasterize.
    pub quad: FilterQuad,
    /// Per-pass parameter block.
    pub globals: &'a FilterGlobals,
    /// Content-hash key devices may use to cache compiled programs.
    pub program: ProgramKey,
}

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The `premultiplied` flag is included to make this explicit
/// at API boundaries.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)` as `[r, g, b, a]`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// GPU context boundary used by the surface pool and the filter pipeline.
///
/// Everything here is owned by the host renderer; the pipeline only borrows it for the duration
/// of a call.
pub trait RenderDevice {
    /// Allocate a color surface of exactly `width x height` physical pixels.
    fn create_surface(&mut self, width: u32, height: u32, samples: u8) -> FxResult<SurfaceId>;

    /// Release the GPU resources behind `id`.
    fn destroy_surface(&mut self, id: SurfaceId);

    /// Make `binding` the active render destination.
    fn bind(&mut self, binding: Binding);

    /// Currently active render destination.
    fn binding(&self) -> Binding;

    /// Clear the whole bound target to a premultiplied color.
    fn clear(&mut self, rgba: [f32; 4]);

    /// Resolve a multisampled surface so it can be sampled.
    fn resolve(&mut self, id: SurfaceId) -> FxResult<()> {
        let _ = id;
        Ok(())
    }

    /// Draw one filter quad into the bound target.
    fn draw_filter(&mut self, draw: &FilterDraw<'_>) -> FxResult<()>;

    /// Host surface size in physical pixels.
    fn screen_size(&self) -> (u32, u32);
}
