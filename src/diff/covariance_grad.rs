//! Gradients for 3D covariance construction.
//!
//! Forward op (in `core/math.rs`):
//!   q_raw -> q = q_raw / ||q_raw|| -> R,  M = R S,  Σ = M Mᵀ
//! packed as (xx, xy, xz, yy, yz, zz).
//!
//! The packed upstream gradient counts each off-diagonal entry once, so the
//! full symmetric dL/dΣ carries half of it in each mirrored slot.

use crate::core::math::quaternion_raw_to_matrix;
use crate::diff::math_grad::normalize4_grad;
use nalgebra::{Matrix3, Vector3, Vector4};

/// Gradient of `quaternion_raw_to_matrix` w.r.t. `q_raw`, given upstream `d_r`.
///
/// `d_r` is dL/dR (3×3). Returns dL/dq_raw as (w,x,y,z).
pub fn quaternion_raw_to_matrix_grad(q_raw: &Vector4<f32>, d_r: &Matrix3<f32>) -> Vector4<f32> {
    let q = q_raw / q_raw.norm();
    let (w, x, y, z) = (q[0], q[1], q[2], q[3]);
    let g = |i: usize, j: usize| d_r[(i, j)];

    // Let L = sum_ij d_r[i,j] * R[i,j]; differentiate the closed form per component.
    let dw = 2.0
        * (-z * g(0, 1) + y * g(0, 2) + z * g(1, 0) - x * g(1, 2) - y * g(2, 0) + x * g(2, 1));
    let dx = 2.0
        * (y * g(0, 1) + z * g(0, 2) + y * g(1, 0) - 2.0 * x * g(1, 1) - w * g(1, 2)
            + z * g(2, 0)
            + w * g(2, 1)
            - 2.0 * x * g(2, 2));
    let dy = 2.0
        * (-2.0 * y * g(0, 0) + x * g(0, 1) + w * g(0, 2) + x * g(1, 0) + z * g(1, 2)
            - w * g(2, 0)
            + z * g(2, 1)
            - 2.0 * y * g(2, 2));
    let dz = 2.0
        * (-2.0 * z * g(0, 0) - w * g(0, 1) + x * g(0, 2) + w * g(1, 0) - 2.0 * z * g(1, 1)
            + y * g(1, 2)
            + x * g(2, 0)
            + y * g(2, 1));

    normalize4_grad(q_raw, &Vector4::new(dw, dx, dy, dz))
}

/// Symmetric dL/dΣ from a packed upstream gradient.
pub fn unpack_cov_grad(d_cov: &[f32; 6]) -> Matrix3<f32> {
    let (a, b, c) = (0.5 * d_cov[1], 0.5 * d_cov[2], 0.5 * d_cov[4]);
    Matrix3::new(d_cov[0], a, b, a, d_cov[3], c, b, c, d_cov[5])
}

/// Gradient of `compute_cov3d_point` w.r.t. scale and raw quaternion.
pub fn compute_cov3d_point_grad(
    scale: &Vector3<f32>,
    quat: &Vector4<f32>,
    d_cov: &[f32; 6],
) -> (Vector3<f32>, Vector4<f32>) {
    let r = quaternion_raw_to_matrix(quat);
    let s = Matrix3::from_diagonal(scale);
    let m = r * s;

    // Σ = M Mᵀ with symmetric G = dL/dΣ  =>  dL/dM = 2 G M
    let d_m = 2.0 * unpack_cov_grad(d_cov) * m;

    // M = R S  =>  dL/dR = dM Sᵀ,  dL/ds_j = sum_i dM_ij R_ij
    let d_r = d_m * s;
    let d_scale = Vector3::from_fn(|j, _| (0..3).map(|i| d_m[(i, j)] * r[(i, j)]).sum::<f32>());

    (d_scale, quaternion_raw_to_matrix_grad(quat, &d_r))
}
