//! SH shading stage: coefficients + view directions -> per-point color.

use crate::backend::NumericalBackend;
use crate::config::ShadeConfig;
use crate::core::sh::validate_degree;
use crate::core::ShCoeffs;
use crate::error::{check_len, Result};
use log::debug;
use nalgebra::Vector3;

/// Forward shading output, flat `[P, C]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Shading {
    pub color: Vec<f32>,
    /// True where the channel was clamped to the floor.
    pub clamped: Vec<bool>,
    pub channels: usize,
}

impl Shading {
    /// Color channels of point `i`.
    pub fn point_color(&self, i: usize) -> &[f32] {
        &self.color[i * self.channels..(i + 1) * self.channels]
    }
}

/// Gradients of a loss over colors.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadeGrads {
    /// Same `[P, D, C]` shape as the input coefficients; bands past the
    /// evaluated degree are zero.
    pub d_coeffs: ShCoeffs,
    pub d_view_dirs: Vec<Vector3<f32>>,
}

fn check_inputs(
    coeffs: &ShCoeffs,
    degree: u32,
    view_dirs: &[Vector3<f32>],
    visibility: &[bool],
) -> Result<()> {
    validate_degree(degree, coeffs.bands())?;
    check_len("view directions", coeffs.num_points(), view_dirs.len())?;
    check_len("visibility mask", coeffs.num_points(), visibility.len())
}

/// Evaluate view-dependent color for every visible point.
///
/// Invisible points get color 0 and no clamp flags.
pub fn shade<B: NumericalBackend + ?Sized>(
    backend: &B,
    coeffs: &ShCoeffs,
    degree: u32,
    view_dirs: &[Vector3<f32>],
    visibility: &[bool],
    config: &ShadeConfig,
) -> Result<Shading> {
    check_inputs(coeffs, degree, view_dirs, visibility)?;
    config.validate()?;

    let shading = backend.shade_forward(coeffs, degree, view_dirs, visibility, config);
    debug!(
        "shaded {} points (degree {}, {} channels) on {} backend",
        coeffs.num_points(),
        degree,
        coeffs.channels(),
        backend.name()
    );
    Ok(shading)
}

/// Gradients w.r.t. coefficients and view directions.
pub fn shade_backward<B: NumericalBackend + ?Sized>(
    backend: &B,
    coeffs: &ShCoeffs,
    degree: u32,
    view_dirs: &[Vector3<f32>],
    visibility: &[bool],
    clamped: &[bool],
    d_color: &[f32],
) -> Result<ShadeGrads> {
    check_inputs(coeffs, degree, view_dirs, visibility)?;
    let per_channel = coeffs.num_points() * coeffs.channels();
    check_len("clamped flags", per_channel, clamped.len())?;
    check_len("dL/dcolor", per_channel, d_color.len())?;

    Ok(backend.shade_backward(coeffs, degree, view_dirs, visibility, clamped, d_color))
}
