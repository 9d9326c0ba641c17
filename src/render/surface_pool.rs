use crate::foundation::core::{Rect, Size};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::{next_pow2, physical_extent};
use crate::render::device::{RenderDevice, SurfaceId};
use std::collections::HashMap;

/// Pool configuration for cached surfaces.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SurfacePoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained surfaces per bucket.
    pub max_surfaces_per_bucket: usize,
}

impl Default for SurfacePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_surfaces_per_bucket: 8,
        }
    }
}

/// Bucket identity under which an idle surface is parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKey {
    /// Exactly screen-sized, no rounding. Invalidated on screen resize.
    Screen {
        /// Sample count (`1` for single-sampled).
        samples: u8,
    },
    /// Power-of-two rounded capacity.
    Pow2 {
        /// Rounded width in pixels.
        w: u32,
        /// Rounded height in pixels.
        h: u32,
        /// Sample count (`1` for single-sampled).
        samples: u8,
    },
}

impl PoolKey {
    fn samples(self) -> u8 {
        match self {
            Self::Screen { samples } | Self::Pow2 { samples, .. } => samples,
        }
    }
}

fn byte_len(w: u32, h: u32, samples: u8) -> usize {
    (w as usize)
        .saturating_mul(h as usize)
        .saturating_mul(4)
        .saturating_mul(usize::from(samples.max(1)))
}

/// A pooled off-screen color surface.
///
/// The physical size is fixed at allocation; the resolution is re-stamped on every acquire so a
/// power-of-two surface can serve any logical size that fits.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    width_px: u32,
    height_px: u32,
    resolution: f64,
    samples: u8,
    pool_key: Option<PoolKey>,
    filter_frame: Option<Rect>,
}

impl Surface {
    /// Wrap a device surface that was not allocated by a pool.
    ///
    /// Such a surface has no pool key, so handing it to [`SurfacePool::release`] is rejected.
    pub fn external(id: SurfaceId, width_px: u32, height_px: u32, resolution: f64) -> Self {
        Self {
            id,
            width_px,
            height_px,
            resolution,
            samples: 1,
            pool_key: None,
            filter_frame: None,
        }
    }

    /// Device handle.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Physical width in pixels.
    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    /// Physical height in pixels.
    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    /// Device-resolution multiplier.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Sample count.
    pub fn samples(&self) -> u8 {
        self.samples
    }

    /// Bucket this surface returns to; `None` once released or for external surfaces.
    pub fn pool_key(&self) -> Option<PoolKey> {
        self.pool_key
    }

    /// Logical region this surface currently holds.
    pub fn filter_frame(&self) -> Option<Rect> {
        self.filter_frame
    }

    /// Attach the logical region this surface was sized for.
    pub fn set_filter_frame(&mut self, frame: Option<Rect>) {
        self.filter_frame = frame;
    }

    /// Copyable snapshot used by filters and bindings.
    pub fn view(&self) -> SurfaceView {
        SurfaceView {
            id: self.id,
            width_px: self.width_px,
            height_px: self.height_px,
            resolution: self.resolution,
            samples: self.samples,
            filter_frame: self.filter_frame,
        }
    }
}

/// Copyable description of a surface, safe to hand to filters while the pool keeps ownership.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceView {
    /// Device handle.
    pub id: SurfaceId,
    /// Physical width in pixels.
    pub width_px: u32,
    /// Physical height in pixels.
    pub height_px: u32,
    /// Device-resolution multiplier.
    pub resolution: f64,
    /// Sample count.
    pub samples: u8,
    /// Logical region held by the surface, if any.
    pub filter_frame: Option<Rect>,
}

impl SurfaceView {
    /// Size in logical units (`pixels / resolution`).
    pub fn logical_size(&self) -> Size {
        let res = if self.resolution > 0.0 {
            self.resolution
        } else {
            1.0
        };
        Size::new(
            f64::from(self.width_px) / res,
            f64::from(self.height_px) / res,
        )
    }

    /// Logical frame of the surface: its filter frame, or the full surface at the origin.
    pub fn frame(&self) -> Rect {
        self.filter_frame
            .unwrap_or_else(|| Rect::from_origin_size((0.0, 0.0), self.logical_size()))
    }
}

/// Pool counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SurfacePoolStats {
    /// Surfaces currently parked in buckets.
    pub retained_surfaces: usize,
    /// Bytes currently parked in buckets.
    pub retained_bytes: usize,
    /// Surfaces created through the device.
    pub alloc_surfaces: u64,
    /// Bytes created through the device.
    pub alloc_bytes: u64,
    /// Surfaces destroyed instead of parked (caps or stale full-screen size).
    pub dropped_on_release: u64,
    /// Surfaces destroyed by `clear`/`set_screen_size`.
    pub destroyed: u64,
}

struct Bucket {
    key: PoolKey,
    surfaces: Vec<Surface>,
}

/// Keyed cache of reusable off-screen surfaces.
///
/// Surfaces are bucketed by power-of-two capacity and sample count, with a dedicated exact-size
/// bucket for screen-sized requests.
pub struct SurfacePool {
    opts: SurfacePoolOpts,
    stats: SurfacePoolStats,

    bucket_idx_by_key: HashMap<PoolKey, usize>,
    buckets: Vec<Bucket>,

    enable_full_screen: bool,
    screen_px: (u32, u32),
}

impl SurfacePool {
    /// Create an empty pool.
    pub fn new(opts: SurfacePoolOpts) -> Self {
        Self {
            opts,
            stats: SurfacePoolStats::default(),
            bucket_idx_by_key: HashMap::new(),
            buckets: Vec::new(),
            enable_full_screen: false,
            screen_px: (0, 0),
        }
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> SurfacePoolStats {
        self.stats.clone()
    }

    /// Whether screen-sized requests use the exact full-screen bucket.
    pub fn full_screen_enabled(&self) -> bool {
        self.enable_full_screen
    }

    /// Number of free surfaces parked under `key`.
    pub fn free_count(&self, key: PoolKey) -> usize {
        self.bucket_idx_by_key
            .get(&key)
            .map_or(0, |&bi| self.buckets[bi].surfaces.len())
    }

    /// Resolve the bucket for a request without touching the pool.
    pub fn key_for(
        &self,
        min_width: f64,
        min_height: f64,
        resolution: f64,
        samples: u8,
    ) -> FxResult<(PoolKey, u32, u32)> {
        let w = physical_extent(min_width, resolution)?;
        let h = physical_extent(min_height, resolution)?;
        let samples = samples.max(1);
        if self.enable_full_screen && (w, h) == self.screen_px {
            return Ok((PoolKey::Screen { samples }, w, h));
        }
        let w = next_pow2(w)?;
        let h = next_pow2(h)?;
        Ok((PoolKey::Pow2 { w, h, samples }, w, h))
    }

    /// Borrow a surface with at least `min_width x min_height` logical area at `resolution`.
    pub fn acquire(
        &mut self,
        device: &mut dyn RenderDevice,
        min_width: f64,
        min_height: f64,
        resolution: f64,
        samples: u8,
    ) -> FxResult<Surface> {
        let (key, w, h) = self.key_for(min_width, min_height, resolution, samples)?;

        let pooled = self
            .bucket_idx_by_key
            .get(&key)
            .and_then(|&bi| self.buckets[bi].surfaces.pop());

        let mut surface = match pooled {
            Some(s) => {
                self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_sub(1);
                self.stats.retained_bytes = self
                    .stats
                    .retained_bytes
                    .saturating_sub(byte_len(s.width_px, s.height_px, s.samples));
                s
            }
            None => {
                let id = device.create_surface(w, h, key.samples())?;
                let bytes = byte_len(w, h, key.samples());
                self.stats.alloc_surfaces = self.stats.alloc_surfaces.saturating_add(1);
                self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(bytes as u64);
                tracing::debug!(?key, w, h, "allocated pooled surface");
                Surface {
                    id,
                    width_px: w,
                    height_px: h,
                    resolution,
                    samples: key.samples(),
                    pool_key: None,
                    filter_frame: None,
                }
            }
        };

        surface.pool_key = Some(key);
        surface.resolution = resolution;
        surface.filter_frame = None;
        Ok(surface)
    }

    /// Borrow a surface sized like `reference`, inheriting its filter frame.
    pub fn get_filter_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        reference: &SurfaceView,
        resolution: Option<f64>,
        samples: Option<u8>,
    ) -> FxResult<Surface> {
        let size = reference.logical_size();
        let resolution = resolution.unwrap_or(reference.resolution);
        let mut surface = self.acquire(
            device,
            size.width,
            size.height,
            resolution,
            samples.unwrap_or(1),
        )?;
        surface.filter_frame = reference.filter_frame;
        Ok(surface)
    }

    /// Return a surface to the bucket it was acquired from.
    pub fn release(&mut self, device: &mut dyn RenderDevice, mut surface: Surface) -> FxResult<()> {
        let Some(key) = surface.pool_key.take() else {
            tracing::error!(id = surface.id.0, "surface released without a pool key");
            return Err(FxError::contract(format!(
                "surface {} released twice or never acquired from the pool",
                surface.id.0
            )));
        };
        surface.filter_frame = None;

        let bytes = byte_len(surface.width_px, surface.height_px, surface.samples);
        let stale_screen = matches!(key, PoolKey::Screen { .. })
            && (!self.enable_full_screen
                || (surface.width_px, surface.height_px) != self.screen_px);
        let over_budget = self.opts.max_pool_bytes == 0
            || self.opts.max_surfaces_per_bucket == 0
            || self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes
            || self.free_count(key) >= self.opts.max_surfaces_per_bucket;

        if stale_screen || over_budget {
            tracing::trace!(?key, stale_screen, "dropping surface on release");
            device.destroy_surface(surface.id);
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return Ok(());
        }

        let bi = match self.bucket_idx_by_key.get(&key).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    key,
                    surfaces: Vec::new(),
                });
                self.bucket_idx_by_key.insert(key, i);
                i
            }
        };

        self.buckets[bi].surfaces.push(surface);
        self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
        Ok(())
    }

    /// Track the host surface size in pixels.
    ///
    /// A change destroys every surface parked under a full-screen key; power-of-two buckets are
    /// left alone.
    pub fn set_screen_size(&mut self, device: &mut dyn RenderDevice, width: u32, height: u32) {
        if (width, height) == self.screen_px {
            return;
        }
        self.enable_full_screen = width > 0 && height > 0;

        let mut destroyed = 0u64;
        for bucket in &mut self.buckets {
            if !matches!(bucket.key, PoolKey::Screen { .. }) {
                continue;
            }
            for s in bucket.surfaces.drain(..) {
                self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_sub(1);
                self.stats.retained_bytes = self
                    .stats
                    .retained_bytes
                    .saturating_sub(byte_len(s.width_px, s.height_px, s.samples));
                device.destroy_surface(s.id);
                destroyed += 1;
            }
        }
        self.stats.destroyed = self.stats.destroyed.saturating_add(destroyed);
        tracing::debug!(
            width,
            height,
            destroyed,
            full_screen = self.enable_full_screen,
            "screen size changed"
        );
        self.screen_px = (width, height);
    }

    /// Empty every bucket.
    ///
    /// With `destroy == false` the parked surfaces are forgotten without touching their device
    /// resources, for hosts that manage those lifetimes themselves.
    pub fn clear(&mut self, device: &mut dyn RenderDevice, destroy: bool) {
        for bucket in self.buckets.drain(..) {
            for s in bucket.surfaces {
                if destroy {
                    device.destroy_surface(s.id);
                    self.stats.destroyed = self.stats.destroyed.saturating_add(1);
                }
            }
        }
        self.bucket_idx_by_key.clear();
        self.stats.retained_surfaces = 0;
        self.stats.retained_bytes = 0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface_pool.rs"]
mod tests;
