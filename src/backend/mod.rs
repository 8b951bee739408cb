//! Numerical kernel boundary.
//!
//! Every forward/backward pair the core calls goes through [`NumericalBackend`].
//! The default method bodies run the per-point kernels on the CPU, either
//! data-parallel with rayon ([`CpuBackend`]) or in a plain loop
//! ([`ReferenceBackend`]). A device backend overrides the methods it
//! accelerates.
//!
//! Inputs reaching a backend have already been shape-checked by the stage
//! entry points in `render`; backends do not validate again.

mod kernels;

use crate::config::{ProjectionConfig, ShadeConfig};
use crate::core::{Camera, ShCoeffs};
use crate::render::{Cov3dGrads, Projection, ShadeGrads, Shading};
use nalgebra::{Vector2, Vector3, Vector4};

/// How the default kernels iterate over points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
    /// One rayon task per point (or chunk of points).
    Parallel,
    /// In-order loop on the calling thread.
    Sequential,
}

/// Capability interface for the forward/backward numerical kernels.
pub trait NumericalBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn execution(&self) -> Execution;

    fn project_forward(
        &self,
        positions: &[Vector3<f32>],
        camera: &Camera,
        config: &ProjectionConfig,
    ) -> Projection {
        kernels::project_forward(self.execution(), positions, camera, config)
    }

    fn project_backward(
        &self,
        positions: &[Vector3<f32>],
        camera: &Camera,
        config: &ProjectionConfig,
        valid: &[bool],
        d_uv: &[Vector2<f32>],
        d_depth: &[f32],
    ) -> Vec<Vector3<f32>> {
        kernels::project_backward(self.execution(), positions, camera, config, valid, d_uv, d_depth)
    }

    fn shade_forward(
        &self,
        coeffs: &ShCoeffs,
        degree: u32,
        view_dirs: &[Vector3<f32>],
        visibility: &[bool],
        config: &ShadeConfig,
    ) -> Shading {
        kernels::shade_forward(self.execution(), coeffs, degree, view_dirs, visibility, config)
    }

    fn shade_backward(
        &self,
        coeffs: &ShCoeffs,
        degree: u32,
        view_dirs: &[Vector3<f32>],
        visibility: &[bool],
        clamped: &[bool],
        d_color: &[f32],
    ) -> ShadeGrads {
        kernels::shade_backward(
            self.execution(),
            coeffs,
            degree,
            view_dirs,
            visibility,
            clamped,
            d_color,
        )
    }

    fn cov3d_forward(
        &self,
        scales: &[Vector3<f32>],
        quats: &[Vector4<f32>],
        visibility: &[bool],
    ) -> Vec<[f32; 6]> {
        kernels::cov3d_forward(self.execution(), scales, quats, visibility)
    }

    fn cov3d_backward(
        &self,
        scales: &[Vector3<f32>],
        quats: &[Vector4<f32>],
        visibility: &[bool],
        d_cov: &[[f32; 6]],
    ) -> Cov3dGrads {
        kernels::cov3d_backward(self.execution(), scales, quats, visibility, d_cov)
    }
}

/// Data-parallel CPU kernels (rayon).
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl NumericalBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn execution(&self) -> Execution {
        Execution::Parallel
    }
}

/// Sequential kernels, used to check determinism of the parallel path.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceBackend;

impl NumericalBackend for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn execution(&self) -> Execution {
        Execution::Sequential
    }
}
