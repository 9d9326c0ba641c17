use crate::effects::filter::{
    ClearMode, DrawState, Filter, FilterContext, FilterOutput, FilterShader,
};
use crate::foundation::core::{
    Affine, Rect, Size, Vec2, is_degenerate, overlaps, pad, snap_to_pixels,
};
use crate::foundation::error::{FxError, FxResult};
use crate::render::device::{Binding, FilterDraw, FilterQuad, RenderDevice, RenderTarget};
use crate::render::globals::FilterGlobals;
use crate::render::pass::{
    PassDescriptor, PassList, first_degenerate, fit_backward, measure_forward, union_frame,
};
use crate::render::program::ProgramKeys;
use crate::render::state::{AutoFitPolicy, FilterState, PaddingPolicy, StateArena};
use crate::render::surface_pool::{
    Surface, SurfacePool, SurfacePoolOpts, SurfacePoolStats, SurfaceView,
};
use std::path::Path;
use std::sync::Arc;

const TRANSPARENT: [f32; 4] = [0.0; 4];

/// Pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineOpts {
    /// Clear on every `Blit` pass even when the draw state does not blend.
    pub force_clear: bool,
    /// How padding combines across a chain.
    pub padding: PaddingPolicy,
    /// How `auto_fit` combines across a chain.
    pub auto_fit: AutoFitPolicy,
    /// Surface pool caps.
    pub pool: SurfacePoolOpts,
}

impl PipelineOpts {
    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> FxResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| FxError::serde(format!("invalid pipeline options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read and parse options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> FxResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FxError::Other(anyhow::Error::new(e).context(format!(
                "failed to read pipeline options '{}'",
                path.display()
            )))
        })?;
        Self::from_json_str(&text)
    }

    /// Reject contradictory pool caps.
    pub fn validate(&self) -> FxResult<()> {
        let bytes_off = self.pool.max_pool_bytes == 0;
        let count_off = self.pool.max_surfaces_per_bucket == 0;
        if bytes_off != count_off {
            return Err(FxError::validation(
                "pool caps must both be zero (no retention) or both be non-zero",
            ));
        }
        Ok(())
    }
}

/// Scene-graph handle whose bounds the pipeline filters.
pub trait FilterTarget {
    /// Untransformed bounds of the subtree in the current logical space.
    fn bounds(&self) -> Rect;

    /// Explicit region overriding [`FilterTarget::bounds`].
    fn filter_area(&self) -> Option<Rect> {
        None
    }
}

impl FilterTarget for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

/// Frames measured for a chain before any surface is acquired.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Measurement {
    /// Padded, pixel-snapped subtree bounds.
    pub target_bounds: Rect,
    /// Indices (into the enabled chain) of units that survived degenerate-frame dropping.
    pub kept: Vec<usize>,
    /// One descriptor per kept unit.
    pub passes: PassList,
    /// Logical region the pass surface must cover.
    pub frame: Rect,
}

struct ActivePass {
    pass: PassDescriptor,
    enclosing: Binding,
    frame: Rect,
    legacy: bool,
}

/// Stack-driven multi-pass filter controller.
///
/// `push` redirects drawing into a pooled surface sized for the chain; `pop` runs the chain and
/// writes the result into whatever was bound before the push. Pushes nest.
pub struct FilterPipeline<D: RenderDevice> {
    device: D,
    pool: SurfacePool,
    opts: PipelineOpts,

    states: StateArena,
    stack: Vec<usize>,

    programs: ProgramKeys,
    globals: FilterGlobals,
    active: Option<ActivePass>,
    draw_state: DrawState,
    legacy_clear_warned: bool,
}

impl<D: RenderDevice> FilterPipeline<D> {
    /// Build a pipeline over `device`. The device's current binding becomes the root destination.
    pub fn new(device: D, opts: PipelineOpts) -> FxResult<Self> {
        opts.validate()?;
        let root = device.binding();
        let mut this = Self {
            device,
            pool: SurfacePool::new(opts.pool),
            opts,
            states: StateArena::new(root),
            stack: vec![StateArena::SENTINEL],
            programs: ProgramKeys::default(),
            globals: FilterGlobals::default(),
            active: None,
            draw_state: DrawState::default(),
            legacy_clear_warned: false,
        };
        this.resize();
        Ok(this)
    }

    /// Borrow the device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutably borrow the device, e.g. to draw the filtered subtree between `push` and `pop`.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Active options.
    pub fn opts(&self) -> &PipelineOpts {
        &self.opts
    }

    /// Borrow the surface pool.
    pub fn pool(&self) -> &SurfacePool {
        &self.pool
    }

    /// Pool counters.
    pub fn pool_stats(&self) -> SurfacePoolStats {
        self.pool.stats()
    }

    /// Number of unmatched pushes.
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    /// State records allocated so far, sentinel included. Bounded by the deepest nesting seen.
    pub fn state_records(&self) -> usize {
        self.states.len()
    }

    /// Pass surface of the innermost push, if it has one.
    pub fn current_surface(&self) -> Option<SurfaceView> {
        let idx = *self.stack.last()?;
        self.states.get(idx).surface.as_ref().map(Surface::view)
    }

    /// Measured frames of the innermost push.
    pub fn current_passes(&self) -> &[PassDescriptor] {
        match self.stack.last() {
            Some(&idx) => self.states.get(idx).passes.as_slice(),
            None => &[],
        }
    }

    /// Forward the device's screen size to the pool.
    #[tracing::instrument(skip(self))]
    pub fn resize(&mut self) {
        let (w, h) = self.device.screen_size();
        self.pool.set_screen_size(&mut self.device, w, h);
    }

    /// Start a displayed frame.
    pub fn begin_frame(&mut self) -> FxResult<()> {
        if self.depth() != 0 {
            return Err(FxError::contract(format!(
                "begin_frame with {} unmatched push(es)",
                self.depth()
            )));
        }
        self.resize();
        Ok(())
    }

    /// Finish a displayed frame. Every push must have been popped.
    pub fn end_frame(&mut self) -> FxResult<SurfacePoolStats> {
        let depth = self.depth();
        if depth != 0 {
            tracing::error!(depth, "frame ended with unmatched pushes");
            return Err(FxError::contract(format!(
                "end_frame with {depth} unmatched push(es)"
            )));
        }
        let stats = self.pool.stats();
        tracing::trace!(?stats, "frame finished");
        Ok(stats)
    }

    /// Borrow a surface of at least `width x height` logical units from the pool.
    pub fn get_optimal_texture(
        &mut self,
        width: f64,
        height: f64,
        resolution: f64,
        samples: u8,
    ) -> FxResult<Surface> {
        self.pool
            .acquire(&mut self.device, width, height, resolution, samples)
    }

    /// Return a surface obtained from this pipeline.
    pub fn return_texture(&mut self, surface: Surface) -> FxResult<()> {
        self.pool.release(&mut self.device, surface)
    }

    /// Destroy every parked surface.
    pub fn empty_pool(&mut self) {
        self.pool.clear(&mut self.device, true);
    }

    /// Release all pooled resources and state records.
    ///
    /// Pushes that are still open are abandoned: their pass surfaces are destroyed with the rest
    /// of the pool and the destination bound before the outermost of them is restored.
    pub fn destroy(&mut self) {
        let open = self.stack.split_off(1);
        if let Some(&outermost) = open.first() {
            tracing::warn!(open = open.len(), "destroying pipeline with unmatched pushes");
            self.device.bind(self.states.get(outermost).enclosing);
        }
        for idx in open {
            let Some(surface) = self.states.take(idx).surface else {
                continue;
            };
            if let Err(e) = self.pool.release(&mut self.device, surface) {
                tracing::error!(error = %e, "failed to reclaim pass surface of an open push");
            }
        }
        self.empty_pool();
        self.states.shrink();
    }

    /// Measure a chain against the currently bound destination without acquiring anything.
    pub fn measure(&self, target: &dyn FilterTarget, filters: &[Arc<dyn Filter>]) -> Measurement {
        let mut state = FilterState::default();
        state.reset();
        state
            .filters
            .extend(filters.iter().filter(|f| f.enabled()).cloned());
        let kept = self.measure_into(&mut state, target, self.device.binding());
        Measurement {
            target_bounds: state.target_bounds,
            kept,
            passes: state.passes,
            frame: state.frame,
        }
    }

    /// Run measurement on `state.filters`, dropping degenerate units until the chain is stable.
    ///
    /// Returns the original indices of the units that were kept.
    fn measure_into(
        &self,
        state: &mut FilterState,
        target: &dyn FilterTarget,
        enclosing: Binding,
    ) -> Vec<usize> {
        let mut kept: Vec<usize> = (0..state.filters.len()).collect();
        let visible = enclosing.source_frame;
        let snap_res = enclosing.resolution();
        let bounds = target.filter_area().unwrap_or_else(|| target.bounds());

        loop {
            if state.filters.is_empty() {
                state.passes.clear();
                state.frame = Rect::ZERO;
                break;
            }
            state.resolve_chain(self.opts.padding, self.opts.auto_fit);
            state.target_bounds = snap_to_pixels(pad(bounds, state.padding), snap_res);
            state.passes = measure_forward(&state.filters, state.target_bounds);

            let out = state.passes.last().map_or(Rect::ZERO, |p| p.output_frame);
            if state.auto_fit {
                if fit_backward(&state.filters, &mut state.passes, visible) {
                    tracing::trace!(?visible, "auto-fit clipped chain output");
                }
            } else if !overlaps(out, visible) {
                tracing::debug!(?out, "filtered region is off-screen; rendering unfiltered");
                state.filters.clear();
                kept.clear();
                continue;
            }

            match first_degenerate(&state.passes) {
                Some(i) => {
                    tracing::debug!(
                        filter = state.filters[i].name(),
                        "dropping filter with a degenerate frame"
                    );
                    state.filters.remove(i);
                    kept.remove(i);
                }
                None => {
                    state.frame = snap_to_pixels(union_frame(&state.passes), snap_res);
                    break;
                }
            }
        }
        kept
    }

    /// Redirect drawing into a pooled surface sized for `filters` applied to `target`.
    ///
    /// Disabled units are skipped. If every unit turns out degenerate the subtree keeps drawing
    /// straight into the current destination and the matching `pop` is a no-op.
    #[tracing::instrument(skip(self, target, filters), fields(filters = filters.len(), depth = self.depth()))]
    pub fn push(&mut self, target: &dyn FilterTarget, filters: &[Arc<dyn Filter>]) -> FxResult<()> {
        if filters.is_empty() {
            tracing::error!("push called with an empty filter chain");
            return Err(FxError::contract("push requires at least one filter"));
        }

        let enclosing = self.device.binding();
        let (idx, mut state) = self.states.acquire();
        state.enclosing = enclosing;
        state
            .filters
            .extend(filters.iter().filter(|f| f.enabled()).cloned());
        self.measure_into(&mut state, target, enclosing);

        if state.filters.is_empty() || is_degenerate(state.frame) {
            tracing::debug!("chain collapsed; subtree renders unfiltered");
            state.filters.clear();
            self.states.park(idx, state);
            self.stack.push(idx);
            return Ok(());
        }

        let frame = state.frame;
        let mut surface = match self.pool.acquire(
            &mut self.device,
            frame.width(),
            frame.height(),
            state.resolution,
            state.multisample,
        ) {
            Ok(s) => s,
            Err(e) => {
                self.states.recycle(idx, state);
                return Err(e);
            }
        };
        surface.set_filter_frame(Some(frame));
        tracing::debug!(
            ?frame,
            w = surface.width_px(),
            h = surface.height_px(),
            resolution = state.resolution,
            "pass surface bound"
        );

        self.device.bind(binding_for(&surface.view()));
        self.device.clear(TRANSPARENT);
        state.surface = Some(surface);
        self.states.park(idx, state);
        self.stack.push(idx);
        Ok(())
    }

    /// Apply the innermost chain and write its result into the destination bound before `push`.
    #[tracing::instrument(skip(self), fields(depth = self.depth()))]
    pub fn pop(&mut self) -> FxResult<()> {
        if self.stack.len() <= 1 {
            tracing::error!("pop without a matching push");
            return Err(FxError::contract("pop without a matching push"));
        }
        let Some(idx) = self.stack.pop() else {
            return Err(FxError::contract("filter stack lost its sentinel"));
        };
        let mut state = self.states.take(idx);
        let result = self.run_chain(&mut state);
        self.states.recycle(idx, state);
        tracing::trace!(free = self.states.free_len(), "filter state recycled");
        result
    }

    fn run_chain(&mut self, state: &mut FilterState) -> FxResult<()> {
        let enclosing = state.enclosing;
        let Some(surface) = state.surface.take() else {
            self.device.bind(enclosing);
            return Ok(());
        };

        let mut flip = Some(surface);
        let mut flop = None;
        let result = self.apply_chain(state, &mut flip, &mut flop);
        // The host keeps drawing where it was before the push, even after a failed pass.
        self.device.bind(enclosing);
        let mut released = Ok(());
        for s in [flip.take(), flop.take()].into_iter().flatten() {
            let r = self.pool.release(&mut self.device, s);
            if released.is_ok() {
                released = r;
            }
        }
        result.and(released)
    }

    /// Resolve the pass surface if needed, then run one pass or the full flip-flop.
    ///
    /// Surfaces still held in `flip`/`flop` on return, error or not, belong to the caller.
    fn apply_chain(
        &mut self,
        state: &FilterState,
        flip: &mut Option<Surface>,
        flop: &mut Option<Surface>,
    ) -> FxResult<()> {
        let pass_surface = view_of(flip)?;
        if pass_surface.samples > 1 {
            self.device.resolve(pass_surface.id)?;
        }

        if state.filters.len() == 1 {
            return self.run_pass(
                state.filters[0].as_ref(),
                &state.passes[0],
                pass_surface,
                FilterOutput::Enclosing,
                ClearMode::Blend,
                state.enclosing,
                state.legacy,
            );
        }
        self.flip_flop(state, flip, flop)
    }

    /// Ping-pong between two pooled surfaces; the last unit writes into the enclosing destination.
    fn flip_flop(
        &mut self,
        state: &FilterState,
        flip: &mut Option<Surface>,
        flop: &mut Option<Surface>,
    ) -> FxResult<()> {
        let enclosing = state.enclosing;
        let last = state.filters.len() - 1;
        let first_view = view_of(flip)?;
        *flop = Some(self.pool.get_filter_texture(
            &mut self.device,
            &first_view,
            Some(state.resolution),
            Some(1),
        )?);

        for i in 0..last {
            let input = view_of(flip)?;
            let output = view_of(flop)?;
            self.run_pass(
                state.filters[i].as_ref(),
                &state.passes[i],
                input,
                FilterOutput::Surface(output),
                ClearMode::Clear,
                enclosing,
                state.legacy,
            )?;
            std::mem::swap(flip, flop);

            // `flop` now holds the surface just read from.
            let finished = i + 1 == last;
            let multisampled = flop.as_ref().is_some_and(|s| s.samples() > 1);
            if finished || multisampled {
                if let Some(done) = flop.take() {
                    self.pool.release(&mut self.device, done)?;
                }
            }
            if !finished && multisampled {
                let like = view_of(flip)?;
                *flop = Some(self.pool.get_filter_texture(
                    &mut self.device,
                    &like,
                    Some(state.resolution),
                    Some(1),
                )?);
            }
        }

        let input = view_of(flip)?;
        self.run_pass(
            state.filters[last].as_ref(),
            &state.passes[last],
            input,
            FilterOutput::Enclosing,
            ClearMode::Blend,
            enclosing,
            state.legacy,
        )
    }

    /// Apply one unit outside of `pop`, writing into `output`.
    ///
    /// `FilterOutput::Enclosing` means the currently bound destination. This is exactly what
    /// `pop` does for a single-unit chain.
    pub fn apply_pass(
        &mut self,
        filter: &dyn Filter,
        pass: &PassDescriptor,
        input: SurfaceView,
        output: FilterOutput,
        clear: ClearMode,
    ) -> FxResult<()> {
        let enclosing = self.device.binding();
        self.run_pass(filter, pass, input, output, clear, enclosing, filter.legacy())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pass(
        &mut self,
        filter: &dyn Filter,
        pass: &PassDescriptor,
        input: SurfaceView,
        output: FilterOutput,
        clear: ClearMode,
        enclosing: Binding,
        legacy: bool,
    ) -> FxResult<()> {
        self.globals = FilterGlobals::for_pass(pass, &input, input.resolution, legacy);
        let prev = self.active.replace(ActivePass {
            pass: *pass,
            enclosing,
            frame: input.frame(),
            legacy,
        });
        tracing::trace!(filter = filter.name(), ?output, "applying filter pass");
        let result = filter.apply(self, input, output, clear);
        self.active = prev;
        result
    }

    fn enclosing_binding(&self) -> Binding {
        self.active
            .as_ref()
            .map_or_else(|| self.device.binding(), |a| a.enclosing)
    }
}

impl<D: RenderDevice> FilterContext for FilterPipeline<D> {
    fn apply_filter(
        &mut self,
        shader: &dyn FilterShader,
        state: DrawState,
        input: SurfaceView,
        output: FilterOutput,
        clear: ClearMode,
    ) -> FxResult<()> {
        if let FilterOutput::Surface(out) = output
            && out.id == input.id
        {
            return Err(FxError::contract(
                "a filter cannot sample the surface it draws into",
            ));
        }
        self.draw_state = state;
        self.bind_and_clear(output, clear)?;

        let positions = self
            .active
            .as_ref()
            .map_or_else(|| input.frame(), |a| a.pass.target_out_frame);
        let legacy = self.active.as_ref().is_some_and(|a| a.legacy);
        let program = self
            .programs
            .key(shader.label(), state, legacy, input.samples);
        let quad = FilterQuad {
            positions,
            uvs: uv_rect(positions, &input),
        };
        self.device.draw_filter(&FilterDraw {
            shader,
            state,
            source: input.id,
            quad,
            globals: &self.globals,
            program,
        })
    }

    fn apply_filter_legacy(
        &mut self,
        shader: &dyn FilterShader,
        state: DrawState,
        input: SurfaceView,
        output: FilterOutput,
        clear: bool,
    ) -> FxResult<()> {
        if !self.legacy_clear_warned {
            self.legacy_clear_warned = true;
            tracing::warn!(
                "boolean clear flags are deprecated; pass ClearMode::Clear or ClearMode::Blend"
            );
        }
        self.apply_filter(shader, state, input, output, ClearMode::from(clear))
    }

    fn bind_and_clear(&mut self, output: FilterOutput, clear: ClearMode) -> FxResult<()> {
        let binding = match output {
            FilterOutput::Enclosing => self.enclosing_binding(),
            FilterOutput::Surface(view) => binding_for(&view),
        };
        self.device.bind(binding);

        let auto_clear = self.draw_state.blend || self.opts.force_clear;
        if clear == ClearMode::Clear || (clear == ClearMode::Blit && auto_clear) {
            self.device.clear(TRANSPARENT);
        }
        Ok(())
    }

    fn get_filter_texture(
        &mut self,
        reference: SurfaceView,
        resolution: Option<f64>,
        samples: Option<u8>,
    ) -> FxResult<Surface> {
        self.pool
            .get_filter_texture(&mut self.device, &reference, resolution, samples)
    }

    fn return_filter_texture(&mut self, surface: Surface) -> FxResult<()> {
        self.pool.release(&mut self.device, surface)
    }

    fn active_pass(&self) -> Option<&PassDescriptor> {
        self.active.as_ref().map(|a| &a.pass)
    }

    fn globals(&self) -> &FilterGlobals {
        &self.globals
    }

    fn calculate_sprite_matrix(
        &self,
        world_transform: Affine,
        texture_size: Size,
        anchor: Vec2,
    ) -> Affine {
        let Some(active) = &self.active else {
            return Affine::IDENTITY;
        };
        if texture_size.width <= 0.0 || texture_size.height <= 0.0 {
            return Affine::IDENTITY;
        }
        let size = self.globals.input_size;
        let mapped = Affine::new([size[0], 0.0, 0.0, size[1], active.frame.x0, active.frame.y0]);
        Affine::translate(anchor)
            * Affine::scale_non_uniform(1.0 / texture_size.width, 1.0 / texture_size.height)
            * world_transform.inverse()
            * mapped
    }
}

/// Bind a pooled surface so its filter frame fills its top-left pixels.
fn binding_for(view: &SurfaceView) -> Binding {
    let frame = view.frame();
    Binding {
        target: RenderTarget::Surface(view.id),
        source_frame: frame,
        dest_frame: Rect::new(
            0.0,
            0.0,
            frame.width() * view.resolution,
            frame.height() * view.resolution,
        ),
    }
}

/// Normalized texture coordinates of a logical rect inside `input`.
fn uv_rect(positions: Rect, input: &SurfaceView) -> Rect {
    let frame = input.frame();
    let size = input.logical_size();
    let (w, h) = (size.width.max(f64::EPSILON), size.height.max(f64::EPSILON));
    Rect::new(
        (positions.x0 - frame.x0) / w,
        (positions.y0 - frame.y0) / h,
        (positions.x1 - frame.x0) / w,
        (positions.y1 - frame.y0) / h,
    )
}

fn view_of(slot: &Option<Surface>) -> FxResult<SurfaceView> {
    slot.as_ref()
        .map(Surface::view)
        .ok_or_else(|| FxError::contract("flip-flop surface missing mid-chain"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
