//! SH shading properties that must hold for every degree.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use splat_core::backend::CpuBackend;
use splat_core::config::ShadeConfig;
use splat_core::core::{num_bands, ShCoeffs, MAX_SH_DEGREE};
use splat_core::render::{shade, shade_backward};
use splat_core::SplatError;

fn random_coeffs(rng: &mut StdRng, n: usize) -> ShCoeffs {
    let bands = num_bands(MAX_SH_DEGREE);
    let data = (0..n * bands * 3).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    ShCoeffs::new(data, n, bands, 3).unwrap()
}

fn random_dirs(rng: &mut StdRng, n: usize) -> Vec<Vector3<f32>> {
    (0..n)
        .map(|_| Vector3::new(rng.gen_range(-1.0f32..1.0), rng.gen_range(-1.0f32..1.0), rng.gen_range(0.2f32..1.0)))
        .collect()
}

#[test]
fn test_higher_bands_are_ignored_below_their_degree() {
    let mut rng = StdRng::seed_from_u64(0x7_2C47E);
    let n = 12;
    let coeffs = random_coeffs(&mut rng, n);
    let dirs = random_dirs(&mut rng, n);
    let vis = vec![true; n];
    let config = ShadeConfig::default();

    for degree in 0..MAX_SH_DEGREE {
        // Zero every band the degree does not use.
        let mut truncated = coeffs.clone();
        for i in 0..n {
            for k in num_bands(degree)..truncated.bands() {
                for c in 0..3 {
                    truncated.set(i, k, c, 0.0);
                }
            }
        }

        let full = shade(&CpuBackend, &coeffs, degree, &dirs, &vis, &config).unwrap();
        let cut = shade(&CpuBackend, &truncated, degree, &dirs, &vis, &config).unwrap();
        assert_eq!(full.color, cut.color, "degree {degree}");

        let d_color: Vec<f32> = (0..n * 3).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
        let grads = shade_backward(&CpuBackend, &coeffs, degree, &dirs, &vis, &full.clamped, &d_color).unwrap();
        for i in 0..n {
            for k in num_bands(degree)..coeffs.bands() {
                for c in 0..3 {
                    assert_eq!(grads.d_coeffs.get(i, k, c), 0.0, "degree {degree} band {k}");
                }
            }
        }
    }
}

#[test]
fn test_degree_four_with_zero_higher_bands_equals_degree_zero() {
    let mut rng = StdRng::seed_from_u64(0xD4_D0);
    let n = 9;
    let mut coeffs = random_coeffs(&mut rng, n);
    for i in 0..n {
        for k in 1..coeffs.bands() {
            for c in 0..3 {
                coeffs.set(i, k, c, 0.0);
            }
        }
    }
    let dirs = random_dirs(&mut rng, n);
    let vis = vec![true; n];
    let config = ShadeConfig::default();

    let dc_only = shade(&CpuBackend, &coeffs, 0, &dirs, &vis, &config).unwrap();
    let full = shade(&CpuBackend, &coeffs, MAX_SH_DEGREE, &dirs, &vis, &config).unwrap();
    assert_eq!(full.color, dc_only.color);
    assert_eq!(full.clamped, dc_only.clamped);
}

#[test]
fn test_degree_zero_is_view_independent() {
    let mut rng = StdRng::seed_from_u64(0xDC);
    let coeffs = random_coeffs(&mut rng, 1);
    let dirs = random_dirs(&mut rng, 5);
    let config = ShadeConfig::default();

    let colors: Vec<Vec<f32>> = dirs
        .iter()
        .map(|d| {
            shade(&CpuBackend, &coeffs, 0, &[*d], &[true], &config)
                .unwrap()
                .color
        })
        .collect();
    for c in &colors[1..] {
        assert_eq!(c, &colors[0]);
    }
}

#[test]
fn test_unnormalized_direction_gives_same_color() {
    let mut rng = StdRng::seed_from_u64(0x5CA1E);
    let coeffs = random_coeffs(&mut rng, 1);
    let dir = Vector3::new(0.3, -0.4, 0.8);
    let config = ShadeConfig::default();

    let unit = shade(&CpuBackend, &coeffs, 4, &[dir.normalize()], &[true], &config).unwrap();
    let scaled = shade(&CpuBackend, &coeffs, 4, &[dir * 7.5], &[true], &config).unwrap();
    for c in 0..3 {
        assert_relative_eq!(unit.color[c], scaled.color[c], epsilon = 1e-5);
    }
}

#[test]
fn test_color_offset_and_floor_come_from_config() {
    let mut coeffs = ShCoeffs::zeros(1, 1, 3).unwrap();
    coeffs.set(0, 0, 0, 1.0);
    coeffs.set(0, 0, 1, -1.0);
    let config = ShadeConfig {
        color_offset: 0.0,
        clamp_floor: -0.1,
    };

    let out = shade(&CpuBackend, &coeffs, 0, &[Vector3::z()], &[true], &config).unwrap();
    assert_relative_eq!(out.color[0], 0.282_094_8, epsilon = 1e-6);
    assert_eq!(out.color[1], -0.1);
    assert_eq!(out.color[2], 0.0);
    assert_eq!(out.clamped, vec![false, true, false]);
}

#[test]
fn test_invisible_points_get_no_gradient() {
    let mut rng = StdRng::seed_from_u64(0x1_2915);
    let coeffs = random_coeffs(&mut rng, 3);
    let dirs = random_dirs(&mut rng, 3);
    let vis = [true, false, true];

    let out = shade(&CpuBackend, &coeffs, 3, &dirs, &vis, &ShadeConfig::default()).unwrap();
    let grads = shade_backward(&CpuBackend, &coeffs, 3, &dirs, &vis, &out.clamped, &[1.0; 9]).unwrap();
    assert_eq!(grads.d_view_dirs[1], Vector3::zeros());
    for k in 0..coeffs.bands() {
        for c in 0..3 {
            assert_eq!(grads.d_coeffs.get(1, k, c), 0.0);
        }
    }
}

#[test]
fn test_rejects_degree_above_four_and_short_coefficients() {
    let coeffs = ShCoeffs::zeros(1, 25, 3).unwrap();
    let err = shade(&CpuBackend, &coeffs, 5, &[Vector3::z()], &[true], &ShadeConfig::default());
    assert!(matches!(err, Err(SplatError::InvalidArgument(_))));

    let short = ShCoeffs::zeros(1, 8, 3).unwrap();
    let err = shade(&CpuBackend, &short, 2, &[Vector3::z()], &[true], &ShadeConfig::default());
    assert!(matches!(err, Err(SplatError::InvalidArgument(_))));

    let err = ShCoeffs::new(vec![0.0; 10], 1, 4, 3);
    assert!(matches!(err, Err(SplatError::ShapeMismatch { .. })));
}
