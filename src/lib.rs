//! Pooled off-screen surfaces and a stack-driven multi-pass filter pipeline.
//!
//! A host renderer calls [`FilterPipeline::push`] before drawing a subtree and
//! [`FilterPipeline::pop`] after it. The pipeline measures how much area the filter chain
//! needs, borrows a power-of-two surface from the [`SurfacePool`], redirects drawing into it, and
//! on `pop` runs every unit in order, ping-ponging between two pooled surfaces, with the final unit
//! writing straight into whatever was bound before the push.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Filter units and the contract they implement.
pub mod effects;
/// Devices, pooling, and the pipeline controller.
pub mod render;

pub use crate::foundation::core::{
    Affine, Point, Rect, Rgba8Premul, Size, Vec2, contains_frame, enlarge_to_contain, fit,
    is_degenerate, overlaps, pad, snap_to_pixels,
};
pub use crate::foundation::error::{FxError, FxResult};

pub use crate::effects::alpha::AlphaFilter;
pub use crate::effects::blur::{BlurAxis, BlurFilter, BlurPassFilter};
pub use crate::effects::color_matrix::ColorMatrixFilter;
pub use crate::effects::filter::{
    BlendMode, ClearMode, DrawState, Filter, FilterContext, FilterOutput, FilterShader,
    InputSource,
};
pub use crate::effects::offset::OffsetFilter;
pub use crate::render::cpu::{CpuDevice, CpuDeviceOpts, CpuDeviceStats};
pub use crate::render::device::{
    Binding, FilterDraw, FilterQuad, FrameRGBA, RenderDevice, RenderTarget, SurfaceId,
    TexelSampler,
};
pub use crate::render::globals::{FilterGlobals, LegacyGlobals};
pub use crate::render::pass::PassDescriptor;
pub use crate::render::pipeline::{FilterPipeline, FilterTarget, Measurement, PipelineOpts};
pub use crate::render::program::ProgramKey;
pub use crate::render::state::{AutoFitPolicy, PaddingPolicy};
pub use crate::render::surface_pool::{
    PoolKey, Surface, SurfacePool, SurfacePoolOpts, SurfacePoolStats, SurfaceView,
};
