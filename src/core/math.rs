//! Mathematical utilities (quaternions, 3D covariance, depth key encoding).

use nalgebra::{Matrix3, Vector3, Vector4};

/// Convert a raw quaternion (w,x,y,z) to a rotation matrix by normalizing it first.
///
/// Formula (from unit quaternion q = w + xi + yj + zk):
/// R = | 1-2(y²+z²)   2(xy-wz)    2(xz+wy)  |
///     | 2(xy+wz)     1-2(x²+z²)  2(yz-wx)  |
///     | 2(xz-wy)     2(yz+wx)    1-2(x²+y²)|
pub fn quaternion_raw_to_matrix(q_raw: &Vector4<f32>) -> Matrix3<f32> {
    let q = q_raw / q_raw.norm();
    let (w, x, y, z) = (q[0], q[1], q[2], q[3]);

    Matrix3::new(
        1.0 - 2.0 * (y * y + z * z),
        2.0 * (x * y - w * z),
        2.0 * (x * z + w * y),
        2.0 * (x * y + w * z),
        1.0 - 2.0 * (x * x + z * z),
        2.0 * (y * z - w * x),
        2.0 * (x * z - w * y),
        2.0 * (y * z + w * x),
        1.0 - 2.0 * (x * x + y * y),
    )
}

/// Pack the upper triangle of a symmetric 3×3 matrix as (xx, xy, xz, yy, yz, zz).
pub fn pack_symmetric(m: &Matrix3<f32>) -> [f32; 6] {
    [
        m[(0, 0)],
        m[(0, 1)],
        m[(0, 2)],
        m[(1, 1)],
        m[(1, 2)],
        m[(2, 2)],
    ]
}

/// Rebuild a symmetric 3×3 matrix from its packed upper triangle.
pub fn unpack_symmetric(c: &[f32; 6]) -> Matrix3<f32> {
    Matrix3::new(c[0], c[1], c[2], c[1], c[3], c[4], c[2], c[4], c[5])
}

/// 3D covariance Σ = R S Sᵀ Rᵀ of one point, packed.
///
/// `scale` holds the actual (not log-space) axis lengths; `quat` is (w,x,y,z)
/// and is normalized here.
pub fn compute_cov3d_point(scale: &Vector3<f32>, quat: &Vector4<f32>) -> [f32; 6] {
    let r = quaternion_raw_to_matrix(quat);
    let m = r * Matrix3::from_diagonal(scale);
    pack_symmetric(&(m * m.transpose()))
}

/// Order-preserving map from an `f32` depth to a `u32`.
///
/// Integer comparison of the results matches float comparison of the inputs,
/// negative values included: non-negative floats get their sign bit set,
/// negative floats have every bit flipped.
pub fn ordered_depth_bits(depth: f32) -> u32 {
    let bits = depth.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

/// Inverse of [`ordered_depth_bits`].
pub fn depth_from_ordered_bits(key: u32) -> f32 {
    let bits = if key & 0x8000_0000 != 0 {
        key & 0x7FFF_FFFF
    } else {
        !key
    };
    f32::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{SymmetricEigen, UnitQuaternion};

    #[test]
    fn test_quaternion_to_matrix_identity() {
        let r = quaternion_raw_to_matrix(&Vector4::new(1.0, 0.0, 0.0, 0.0));
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_quaternion_to_matrix_matches_nalgebra() {
        let uq = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        // Raw input deliberately not unit length.
        let raw = Vector4::new(uq.w, uq.i, uq.j, uq.k) * 2.5;
        let r = quaternion_raw_to_matrix(&raw);
        assert_relative_eq!(r, uq.to_rotation_matrix().into_inner(), epsilon = 1e-5);
    }

    #[test]
    fn test_quaternion_to_matrix_orthogonal() {
        let r = quaternion_raw_to_matrix(&Vector4::new(0.3, -0.5, 0.2, 0.7));
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-5);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_cov3d_axis_aligned() {
        let cov = compute_cov3d_point(&Vector3::new(1.0, 2.0, 3.0), &Vector4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(cov, [1.0, 0.0, 0.0, 4.0, 0.0, 9.0]);
    }

    #[test]
    fn test_cov3d_positive_definite() {
        let cov = compute_cov3d_point(&Vector3::new(0.1, 0.5, 0.02), &Vector4::new(0.2, 0.4, -0.6, 0.1));
        let m = unpack_symmetric(&cov);
        let eig = SymmetricEigen::new(m);
        for v in eig.eigenvalues.iter() {
            assert!(*v > 0.0, "eigenvalue not positive: {}", v);
        }
    }

    #[test]
    fn test_ordered_depth_bits_preserves_order() {
        let depths = [
            f32::NEG_INFINITY,
            -1e6,
            -2.0,
            -1.0,
            -1e-20,
            -0.0,
            0.0,
            1e-20,
            0.5,
            1.0,
            2.0,
            1e6,
            f32::INFINITY,
        ];
        for pair in depths.windows(2) {
            assert!(
                ordered_depth_bits(pair[0]) <= ordered_depth_bits(pair[1]),
                "order broken between {} and {}",
                pair[0],
                pair[1]
            );
        }
        assert!(ordered_depth_bits(1.0) < ordered_depth_bits(2.0));
        assert!(ordered_depth_bits(-2.0) < ordered_depth_bits(-1.0));
    }

    #[test]
    fn test_ordered_depth_bits_inverse() {
        for d in [-3.5f32, -0.25, 0.0, 0.2, 1.0, 42.0] {
            assert_eq!(depth_from_ordered_bits(ordered_depth_bits(d)), d);
        }
    }
}
