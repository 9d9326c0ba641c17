//! Filter unit contract and the units shipped with the crate.

/// Constant-opacity unit.
pub mod alpha;
/// Separable Gaussian blur units.
pub mod blur;
/// 4x5 color matrix unit.
pub mod color_matrix;
/// Unit trait and pipeline callbacks.
pub mod filter;
/// Displacement unit.
pub mod offset;
