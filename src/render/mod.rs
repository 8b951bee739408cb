//! Stage entry points.
//!
//! Each stage validates shapes and arguments, then calls the matching
//! [`NumericalBackend`](crate::backend::NumericalBackend) kernel:
//! - `project`: 3D points -> pixel coordinates + depth
//! - `shade`: SH coefficients + view directions -> color
//! - `cov3d`: scales + rotations -> 3D covariance
//!
//! Tile binning and sorting live in `sort`; autodiff wrappers in `bridge`.

pub mod cov3d;
pub mod project;
pub mod shade;

pub use cov3d::{compute_cov3d, compute_cov3d_backward, Cov3dGrads};
pub use project::{project, project_backward, Projection};
pub use shade::{shade, shade_backward, ShadeGrads, Shading};
