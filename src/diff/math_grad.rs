//! Gradients for small vector utilities shared by several stages.

use nalgebra::{Vector3, Vector4};

/// Gradient of `v / ||v||` w.r.t. `v`, given upstream `d_n`.
///
/// dL/dv = (I - n nᵀ) dL/dn / ||v||
///
/// Returns zero for a (near) zero vector, where the forward pass substitutes a
/// fixed direction.
pub fn normalize3_grad(v: &Vector3<f32>, d_n: &Vector3<f32>) -> Vector3<f32> {
    let norm = v.norm();
    if norm <= 1e-12 {
        return Vector3::zeros();
    }
    let n = v / norm;
    (d_n - n * n.dot(d_n)) / norm
}

/// Gradient of `q / ||q||` for a 4-vector.
pub fn normalize4_grad(q: &Vector4<f32>, d_n: &Vector4<f32>) -> Vector4<f32> {
    let norm = q.norm();
    if norm <= 1e-12 {
        return Vector4::zeros();
    }
    let n = q / norm;
    (d_n - n * n.dot(d_n)) / norm
}
