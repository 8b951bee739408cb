//! Core data structures and mathematical operations.
//!
//! - `Camera`: view/projection matrices, intrinsics and the point projection
//! - `ShCoeffs`: per-point spherical harmonics coefficients and the SH basis
//! - Math utilities: quaternions, packed covariance, depth key encoding
//!
//! All types here are "pure data" - no I/O, no backend dispatch.

pub mod camera;
pub mod math;
pub mod sh;

// Re-export public types
pub use camera::{Camera, CameraIntrinsics, ProjectedPoint, EXCLUDED_DEPTH};
pub use math::{compute_cov3d_point, ordered_depth_bits, quaternion_raw_to_matrix};
pub use sh::{evaluate_sh_point, num_bands, sh_basis, ShCoeffs, MAX_SH_DEGREE};
