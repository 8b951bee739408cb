//! 3D covariance stage: scales + rotations -> packed Σ per point.

use crate::backend::NumericalBackend;
use crate::error::{check_len, Result};
use log::debug;
use nalgebra::{Vector3, Vector4};

/// Gradients of a loss over packed covariances.
#[derive(Clone, Debug, PartialEq)]
pub struct Cov3dGrads {
    pub d_scales: Vec<Vector3<f32>>,
    /// w.r.t. the raw (unnormalized) quaternions, (w,x,y,z).
    pub d_quats: Vec<Vector4<f32>>,
}

fn check_inputs(scales: &[Vector3<f32>], quats: &[Vector4<f32>], visibility: &[bool]) -> Result<()> {
    check_len("quaternions", scales.len(), quats.len())?;
    check_len("visibility mask", scales.len(), visibility.len())
}

/// Packed covariance (xx, xy, xz, yy, yz, zz) of each visible point; zeros otherwise.
pub fn compute_cov3d<B: NumericalBackend + ?Sized>(
    backend: &B,
    scales: &[Vector3<f32>],
    quats: &[Vector4<f32>],
    visibility: &[bool],
) -> Result<Vec<[f32; 6]>> {
    check_inputs(scales, quats, visibility)?;
    let cov = backend.cov3d_forward(scales, quats, visibility);
    debug!("built {} covariances on {} backend", cov.len(), backend.name());
    Ok(cov)
}

pub fn compute_cov3d_backward<B: NumericalBackend + ?Sized>(
    backend: &B,
    scales: &[Vector3<f32>],
    quats: &[Vector4<f32>],
    visibility: &[bool],
    d_cov: &[[f32; 6]],
) -> Result<Cov3dGrads> {
    check_inputs(scales, quats, visibility)?;
    check_len("dL/dcov3d", scales.len(), d_cov.len())?;
    Ok(backend.cov3d_backward(scales, quats, visibility, d_cov))
}
