//! Gradients for spherical harmonics evaluation.
//!
//! Forward op (in `core/sh.rs`):
//! `color_c = max(sum_k Y_k(n) * coeffs[k][c] + offset, floor)`, `n = dir / ||dir||`.
//!
//! Two gradients come out of a single upstream `d_color`:
//! - w.r.t. the coefficients, which is linear in the basis values
//! - w.r.t. the (unnormalized) view direction, which needs the analytic
//!   derivative of every basis function and then the normalization Jacobian
//!
//! Channels that were clamped in the forward pass pass no gradient at all.

use crate::core::sh::{normalize_direction, num_bands, sh_basis, MAX_SH_BANDS, SH_C1, SH_C2, SH_C3, SH_C4};
use crate::diff::math_grad::normalize3_grad;
use nalgebra::Vector3;

/// Partial derivatives ∂Y_k/∂(x, y, z) of each basis function up to `degree`.
///
/// The basis polynomials are differentiated as functions of three free
/// variables; callers project out the radial part through `normalize3_grad`.
pub fn sh_basis_grad(degree: u32, dir: &Vector3<f32>) -> [Vector3<f32>; MAX_SH_BANDS] {
    let mut g = [Vector3::zeros(); MAX_SH_BANDS];
    if degree == 0 {
        return g;
    }

    let (x, y, z) = (dir.x, dir.y, dir.z);
    g[1] = Vector3::new(0.0, -SH_C1, 0.0);
    g[2] = Vector3::new(0.0, 0.0, SH_C1);
    g[3] = Vector3::new(-SH_C1, 0.0, 0.0);
    if degree == 1 {
        return g;
    }

    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (xy, yz, xz) = (x * y, y * z, x * z);
    g[4] = SH_C2[0] * Vector3::new(y, x, 0.0);
    g[5] = SH_C2[1] * Vector3::new(0.0, z, y);
    g[6] = SH_C2[2] * Vector3::new(-2.0 * x, -2.0 * y, 4.0 * z);
    g[7] = SH_C2[3] * Vector3::new(z, 0.0, x);
    g[8] = SH_C2[4] * Vector3::new(2.0 * x, -2.0 * y, 0.0);
    if degree == 2 {
        return g;
    }

    g[9] = SH_C3[0] * Vector3::new(6.0 * xy, 3.0 * xx - 3.0 * yy, 0.0);
    g[10] = SH_C3[1] * Vector3::new(yz, xz, xy);
    g[11] = SH_C3[2] * Vector3::new(-2.0 * xy, 4.0 * zz - xx - 3.0 * yy, 8.0 * yz);
    g[12] = SH_C3[3] * Vector3::new(-6.0 * xz, -6.0 * yz, 6.0 * zz - 3.0 * xx - 3.0 * yy);
    g[13] = SH_C3[4] * Vector3::new(4.0 * zz - 3.0 * xx - yy, -2.0 * xy, 8.0 * xz);
    g[14] = SH_C3[5] * Vector3::new(2.0 * xz, -2.0 * yz, xx - yy);
    g[15] = SH_C3[6] * Vector3::new(3.0 * xx - 3.0 * yy, -6.0 * xy, 0.0);
    if degree == 3 {
        return g;
    }

    let xyz = xy * z;
    g[16] = SH_C4[0] * Vector3::new(y * (3.0 * xx - yy), x * (xx - 3.0 * yy), 0.0);
    g[17] = SH_C4[1] * Vector3::new(6.0 * xyz, z * (3.0 * xx - 3.0 * yy), y * (3.0 * xx - yy));
    g[18] = SH_C4[2] * Vector3::new(y * (7.0 * zz - 1.0), x * (7.0 * zz - 1.0), 14.0 * xyz);
    g[19] = SH_C4[3] * Vector3::new(0.0, z * (7.0 * zz - 3.0), y * (21.0 * zz - 3.0));
    g[20] = SH_C4[4] * Vector3::new(0.0, 0.0, z * (140.0 * zz - 60.0));
    g[21] = SH_C4[5] * Vector3::new(z * (7.0 * zz - 3.0), 0.0, x * (21.0 * zz - 3.0));
    g[22] = SH_C4[6]
        * Vector3::new(
            2.0 * x * (7.0 * zz - 1.0),
            -2.0 * y * (7.0 * zz - 1.0),
            14.0 * z * (xx - yy),
        );
    g[23] = SH_C4[7] * Vector3::new(z * (3.0 * xx - 3.0 * yy), -6.0 * xyz, x * (xx - 3.0 * yy));
    g[24] = SH_C4[8] * Vector3::new(4.0 * x * (xx - 3.0 * yy), 4.0 * y * (yy - 3.0 * xx), 0.0);
    g
}

/// Gradient of one point's color w.r.t. its coefficients and view direction.
///
/// Writes dL/dcoeffs into `d_coeffs` (the point's `[D, C]` block, fully
/// overwritten) and returns dL/d(dir) for the unnormalized input direction.
pub fn evaluate_sh_point_backward(
    coeffs: &[f32],
    channels: usize,
    degree: u32,
    dir: &Vector3<f32>,
    clamped: &[bool],
    d_color: &[f32],
    d_coeffs: &mut [f32],
) -> Vector3<f32> {
    d_coeffs.iter_mut().for_each(|v| *v = 0.0);

    let n = normalize_direction(dir);
    let basis = sh_basis(degree, &n);
    let basis_grad = sh_basis_grad(degree, &n);
    let bands = num_bands(degree);

    let mut d_n = Vector3::<f32>::zeros();
    for c in 0..channels {
        if clamped[c] {
            continue;
        }
        let g = d_color[c];
        for k in 0..bands {
            d_coeffs[k * channels + c] = basis[k] * g;
            d_n += basis_grad[k] * (coeffs[k * channels + c] * g);
        }
    }

    normalize3_grad(dir, &d_n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sh_basis_grad_matches_finite_difference() {
        // Differentiate the basis polynomials directly (no normalization).
        let p = Vector3::new(0.3f32, -0.45, 0.7);
        let g = sh_basis_grad(4, &p);
        let eps = 1e-3f32;
        for axis in 0..3 {
            let mut plus = p;
            let mut minus = p;
            plus[axis] += eps;
            minus[axis] -= eps;
            let bp = sh_basis(4, &plus);
            let bm = sh_basis(4, &minus);
            for k in 0..MAX_SH_BANDS {
                let num = (bp[k] - bm[k]) / (2.0 * eps);
                assert_relative_eq!(g[k][axis], num, epsilon = 2e-3);
            }
        }
    }

    #[test]
    fn test_clamped_channel_gets_no_gradient() {
        let coeffs = [1.0f32, 2.0, 0.5, -0.5, 0.25, 0.75, 0.1, 0.2];
        let mut d_coeffs = [9.0f32; 8];
        let d_dir = evaluate_sh_point_backward(
            &coeffs,
            2,
            1,
            &Vector3::new(0.2, 0.1, 1.0),
            &[true, true],
            &[5.0, -3.0],
            &mut d_coeffs,
        );
        assert!(d_coeffs.iter().all(|&v| v == 0.0));
        assert_eq!(d_dir, Vector3::zeros());
    }

    #[test]
    fn test_degree_zero_has_no_direction_gradient() {
        let coeffs = [0.7f32, -0.2, 0.4];
        let mut d_coeffs = [0.0f32; 3];
        let d_dir = evaluate_sh_point_backward(
            &coeffs,
            3,
            0,
            &Vector3::new(0.3, -0.4, 0.8),
            &[false; 3],
            &[1.0, 1.0, 1.0],
            &mut d_coeffs,
        );
        assert_eq!(d_dir, Vector3::zeros());
        assert_relative_eq!(d_coeffs[1], crate::core::sh::SH_C0, epsilon = 1e-7);
    }
}
