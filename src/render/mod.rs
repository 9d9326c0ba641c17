//! Surface pooling and the multi-pass filter pipeline.
//!
//! The pipeline talks to the GPU only through [`device::RenderDevice`]; [`cpu::CpuDevice`] is a
//! software implementation used for testing and headless runs.

/// Blend helpers for premultiplied RGBA8.
pub mod composite;
/// Software render device.
pub mod cpu;
/// Device boundary and draw requests.
pub mod device;
/// Per-pass parameter block.
pub mod globals;
/// Frame measurement for filter chains.
pub mod pass;
/// Push/pop filter controller.
pub mod pipeline;
/// Program cache keys.
pub mod program;
pub(crate) mod state;
/// Keyed pool of off-screen surfaces.
pub mod surface_pool;
