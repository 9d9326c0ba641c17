use std::collections::{HashMap, HashSet};

use crate::foundation::core::{Point, Rect, Rgba8Premul};
use crate::foundation::error::{FxError, FxResult};
use crate::render::composite::{blend, over_in_place};
use crate::render::device::{
    Binding, FilterDraw, FrameRGBA, RenderDevice, RenderTarget, SurfaceId, TexelSampler,
};
use crate::render::program::ProgramKey;

/// Configuration of the software device.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CpuDeviceOpts {
    /// Host surface width in physical pixels.
    pub screen_width: u32,
    /// Host surface height in physical pixels.
    pub screen_height: u32,
    /// Physical pixels per logical unit of the host surface.
    pub resolution: f64,
    /// Upper bound on bytes held by live off-screen surfaces.
    pub max_surface_bytes: usize,
}

impl Default for CpuDeviceOpts {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 600,
            resolution: 1.0,
            max_surface_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Device counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CpuDeviceStats {
    /// Surfaces ever created.
    pub created: u64,
    /// Surfaces destroyed.
    pub destroyed: u64,
    /// Surfaces currently alive.
    pub live: usize,
    /// Bytes held by live surfaces.
    pub live_bytes: usize,
    /// Filter quads drawn.
    pub draws: u64,
    /// Clears issued.
    pub clears: u64,
    /// Distinct programs seen, i.e. what a GPU device would have compiled.
    pub programs: usize,
}

struct CpuSurface {
    samples: u8,
    pixmap: vello_cpu::Pixmap,
}

/// Software [`RenderDevice`] over `vello_cpu` pixmaps.
///
/// Filter quads are rasterized at pixel centers with nearest sampling, which keeps results exact
/// enough to compare pipeline output pixel for pixel.
pub struct CpuDevice {
    opts: CpuDeviceOpts,
    screen: vello_cpu::Pixmap,
    surfaces: HashMap<SurfaceId, CpuSurface>,
    next_id: u32,
    binding: Binding,
    programs: HashSet<ProgramKey>,
    stats: CpuDeviceStats,
}

impl CpuDevice {
    /// Create a device with a transparent host surface bound.
    pub fn new(opts: CpuDeviceOpts) -> FxResult<Self> {
        if !(opts.resolution.is_finite() && opts.resolution > 0.0) {
            return Err(FxError::validation(format!(
                "device resolution must be finite and > 0, got {}",
                opts.resolution
            )));
        }
        let (w, h) = pixmap_dims(opts.screen_width, opts.screen_height)?;
        let mut this = Self {
            opts,
            screen: vello_cpu::Pixmap::new(w, h),
            surfaces: HashMap::new(),
            next_id: 1,
            binding: Binding::default(),
            programs: HashSet::new(),
            stats: CpuDeviceStats::default(),
        };
        this.binding = this.root_binding();
        Ok(this)
    }

    /// Active options.
    pub fn opts(&self) -> &CpuDeviceOpts {
        &self.opts
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CpuDeviceStats {
        let mut stats = self.stats.clone();
        stats.live = self.surfaces.len();
        stats.programs = self.programs.len();
        stats
    }

    /// Whether `id` names a live surface.
    pub fn is_live(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    /// Binding that maps the whole logical screen onto the host surface.
    pub fn root_binding(&self) -> Binding {
        let res = self.opts.resolution;
        let (w, h) = (
            f64::from(self.opts.screen_width),
            f64::from(self.opts.screen_height),
        );
        Binding {
            target: RenderTarget::Screen,
            source_frame: Rect::new(0.0, 0.0, w / res, h / res),
            dest_frame: Rect::new(0.0, 0.0, w, h),
        }
    }

    /// Resize the host surface. Its contents are discarded.
    ///
    /// If the screen was bound, the new root binding replaces the old one.
    pub fn set_screen_size(&mut self, width: u32, height: u32) -> FxResult<()> {
        let (w, h) = pixmap_dims(width, height)?;
        self.screen = vello_cpu::Pixmap::new(w, h);
        self.opts.screen_width = width;
        self.opts.screen_height = height;
        if self.binding.target == RenderTarget::Screen {
            self.binding = self.root_binding();
        }
        tracing::debug!(width, height, "host surface resized");
        Ok(())
    }

    /// Fill a logical rectangle of the bound target with a solid color, source-over.
    ///
    /// This stands in for the host renderer drawing a subtree.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba8Premul) -> FxResult<()> {
        let binding = self.binding;
        let (sx, sy) = binding_scale(&binding);
        let target = self.target_pixmap_mut()?;
        let (w, h) = (target.width(), target.height());

        let straight = unpremultiply(color);
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(vello_cpu::kurbo::Affine::new([
            sx,
            0.0,
            0.0,
            sy,
            binding.dest_frame.x0 - binding.source_frame.x0 * sx,
            binding.dest_frame.y0 - binding.source_frame.y0 * sy,
        ]));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            straight[0],
            straight[1],
            straight[2],
            straight[3],
        ));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            rect.x0, rect.y0, rect.x1, rect.y1,
        ));
        ctx.flush();

        let mut layer = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut layer);
        over_in_place(
            target.data_as_u8_slice_mut(),
            layer.data_as_u8_slice(),
            1.0,
        )
    }

    /// Copy the pixels of `target` out as premultiplied RGBA8.
    pub fn read_pixels(&self, target: RenderTarget) -> FxResult<FrameRGBA> {
        let pixmap = match target {
            RenderTarget::Screen => &self.screen,
            RenderTarget::Surface(id) => {
                &self
                    .surfaces
                    .get(&id)
                    .ok_or_else(|| FxError::resource(format!("readback of unknown surface {id:?}")))?
                    .pixmap
            }
        };
        Ok(FrameRGBA {
            width: u32::from(pixmap.width()),
            height: u32::from(pixmap.height()),
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn target_pixmap_mut(&mut self) -> FxResult<&mut vello_cpu::Pixmap> {
        match self.binding.target {
            RenderTarget::Screen => Ok(&mut self.screen),
            RenderTarget::Surface(id) => self
                .surfaces
                .get_mut(&id)
                .map(|s| &mut s.pixmap)
                .ok_or_else(|| FxError::resource(format!("bound surface {id:?} does not exist"))),
        }
    }
}

impl RenderDevice for CpuDevice {
    fn create_surface(&mut self, width: u32, height: u32, samples: u8) -> FxResult<SurfaceId> {
        let (w, h) = pixmap_dims(width, height)?;
        let bytes = surface_bytes(width, height);
        if self.stats.live_bytes.saturating_add(bytes) > self.opts.max_surface_bytes {
            return Err(FxError::resource(format!(
                "allocating {width}x{height} would exceed the {} byte surface budget",
                self.opts.max_surface_bytes
            )));
        }

        let id = SurfaceId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| FxError::resource("surface ids exhausted"))?;
        self.surfaces.insert(
            id,
            CpuSurface {
                samples: samples.max(1),
                pixmap: vello_cpu::Pixmap::new(w, h),
            },
        );
        self.stats.created += 1;
        self.stats.live_bytes += bytes;
        Ok(id)
    }

    fn destroy_surface(&mut self, id: SurfaceId) {
        match self.surfaces.remove(&id) {
            Some(s) => {
                let bytes = surface_bytes(u32::from(s.pixmap.width()), u32::from(s.pixmap.height()));
                self.stats.live_bytes = self.stats.live_bytes.saturating_sub(bytes);
                self.stats.destroyed += 1;
                if self.binding.target == RenderTarget::Surface(id) {
                    self.binding = self.root_binding();
                }
            }
            None => tracing::warn!(id = id.0, "destroy of unknown surface ignored"),
        }
    }

    fn bind(&mut self, binding: Binding) {
        self.binding = binding;
    }

    fn binding(&self) -> Binding {
        self.binding
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        let px = Rgba8Premul::from_f32(rgba).to_array();
        match self.target_pixmap_mut() {
            Ok(pixmap) => clear_pixmap(pixmap, px),
            Err(e) => {
                tracing::warn!(error = %e, "clear of a missing target ignored");
                return;
            }
        }
        self.stats.clears += 1;
    }

    fn resolve(&mut self, id: SurfaceId) -> FxResult<()> {
        // One sample buffer per surface on the CPU; nothing to resolve.
        let surface = self
            .surfaces
            .get(&id)
            .ok_or_else(|| FxError::resource(format!("resolve of unknown surface {id:?}")))?;
        tracing::trace!(id = id.0, samples = surface.samples, "resolve");
        Ok(())
    }

    fn draw_filter(&mut self, draw: &FilterDraw<'_>) -> FxResult<()> {
        let binding = self.binding;
        let target_id = match binding.target {
            RenderTarget::Screen => None,
            RenderTarget::Surface(id) => Some(id),
        };
        if target_id == Some(draw.source) {
            return Err(FxError::contract(format!(
                "surface {:?} is both sampled and drawn into",
                draw.source
            )));
        }

        let mut target = match target_id {
            Some(id) => Some(self.surfaces.remove(&id).ok_or_else(|| {
                FxError::resource(format!("bound surface {id:?} does not exist"))
            })?),
            None => None,
        };
        let result = match &mut target {
            Some(t) => rasterize(&mut t.pixmap, &self.surfaces, &binding, draw),
            None => rasterize(&mut self.screen, &self.surfaces, &binding, draw),
        };
        if let (Some(id), Some(t)) = (target_id, target) {
            self.surfaces.insert(id, t);
        }
        result?;

        self.programs.insert(draw.program);
        self.stats.draws += 1;
        Ok(())
    }

    fn screen_size(&self) -> (u32, u32) {
        (self.opts.screen_width, self.opts.screen_height)
    }
}

/// Shade every pixel whose center lies inside the projected quad.
fn rasterize(
    target: &mut vello_cpu::Pixmap,
    surfaces: &HashMap<SurfaceId, CpuSurface>,
    binding: &Binding,
    draw: &FilterDraw<'_>,
) -> FxResult<()> {
    let source = surfaces
        .get(&draw.source)
        .ok_or_else(|| FxError::resource(format!("sampled surface {:?} does not exist", draw.source)))?;
    let sampler = TexelSampler::new(
        source.pixmap.data_as_u8_slice(),
        u32::from(source.pixmap.width()),
        u32::from(source.pixmap.height()),
    );

    let (sx, sy) = binding_scale(binding);
    let q = draw.quad;
    let px0 = binding.dest_frame.x0 + (q.positions.x0 - binding.source_frame.x0) * sx;
    let py0 = binding.dest_frame.y0 + (q.positions.y0 - binding.source_frame.y0) * sy;
    let px1 = binding.dest_frame.x0 + (q.positions.x1 - binding.source_frame.x0) * sx;
    let py1 = binding.dest_frame.y0 + (q.positions.y1 - binding.source_frame.y0) * sy;
    if px1 <= px0 || py1 <= py0 {
        return Ok(());
    }

    let tw = i64::from(target.width());
    let th = i64::from(target.height());
    let x_start = ((px0 - 0.5).ceil() as i64).clamp(0, tw);
    let x_end = ((px1 - 0.5).ceil() as i64).clamp(0, tw);
    let y_start = ((py0 - 0.5).ceil() as i64).clamp(0, th);
    let y_end = ((py1 - 0.5).ceil() as i64).clamp(0, th);

    let stride = target.width() as usize;
    let data = target.data_as_u8_slice_mut();
    for y in y_start..y_end {
        let ty = (y as f64 + 0.5 - py0) / (py1 - py0);
        let v = q.uvs.y0 + ty * (q.uvs.y1 - q.uvs.y0);
        for x in x_start..x_end {
            let tx = (x as f64 + 0.5 - px0) / (px1 - px0);
            let u = q.uvs.x0 + tx * (q.uvs.x1 - q.uvs.x0);
            let shaded = draw.shader.fragment(&sampler, Point::new(u, v), draw.globals);
            let src = Rgba8Premul::from_f32(shaded).to_array();

            let idx = (y as usize * stride + x as usize) * 4;
            let dst = [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]];
            data[idx..idx + 4].copy_from_slice(&blend(dst, src, draw.state));
        }
    }
    Ok(())
}

fn binding_scale(binding: &Binding) -> (f64, f64) {
    let src = binding.source_frame;
    let dst = binding.dest_frame;
    let sx = if src.width() > 0.0 {
        dst.width() / src.width()
    } else {
        1.0
    };
    let sy = if src.height() > 0.0 {
        dst.height() / src.height()
    } else {
        1.0
    };
    (sx, sy)
}

fn pixmap_dims(width: u32, height: u32) -> FxResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| FxError::resource("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| FxError::resource("surface height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(FxError::resource(format!(
            "surface size {width}x{height} is empty"
        )));
    }
    Ok((w, h))
}

fn surface_bytes(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}

fn unpremultiply(c: Rgba8Premul) -> [u8; 4] {
    if c.a == 0 {
        return [0, 0, 0, 0];
    }
    let a = u16::from(c.a);
    let un = |v: u8| -> u8 { ((u16::from(v) * 255 + a / 2) / a).min(255) as u8 };
    [un(c.r), un(c.g), un(c.b), c.a]
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    let data = pixmap.data_as_u8_slice_mut();
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
