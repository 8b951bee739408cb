//! # splat-core: differentiable Gaussian splatting core
//!
//! The per-point stages of a 3D Gaussian Splatting renderer, each with a
//! forward and an analytic backward pass, plus the tile binning that feeds a
//! tile-based rasterizer.
//!
//! ## Architecture
//!
//! - `core`: Cameras, SH coefficients and basis, covariance math
//! - `diff`: Per-point backward passes
//! - `backend`: `NumericalBackend` trait and the CPU kernels behind it
//! - `render`: Stage entry points (projection, SH shading, 3D covariance)
//! - `sort`: Tile keys, global depth sort, per-tile ranges
//! - `bridge`: Autodiff graph nodes wrapping the stages
//! - `config`: Serde-backed settings
//!
//! ## Pipeline
//!
//! ```text
//! positions --project--> (uv, depth, valid)
//!                              |            radius, overlap counts (upstream)
//!                              v                     |
//!                     build_keys -> sort -> compute_ranges -> rasterizer
//! coeffs + view dirs --shade--> color
//! scales + quats --cov3d--> Σ
//! ```

// Settings and error types
pub mod config;
pub mod error;

// Core data structures and math
pub mod core;

// Differentiable operations (backward passes)
pub mod diff;

// Numerical kernels
pub mod backend;

// Forward/backward stage entry points
pub mod render;

// Tile binning and depth sort
pub mod sort;

// Autodiff graph nodes
pub mod bridge;

// Re-export commonly used types at crate root for convenience
pub use backend::{CpuBackend, NumericalBackend, ReferenceBackend};
pub use config::{GuardBound, PixelMapping, ProjectionConfig, RenderSettings, ShadeConfig, TileConfig};
pub use crate::core::{Camera, CameraIntrinsics, ShCoeffs};
pub use error::{Result, SplatError};
pub use sort::{sort_gaussians, TileBins, TileRange};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
