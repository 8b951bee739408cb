//! Default CPU kernel bodies shared by both built-in backends.
//!
//! Each kernel is a loop over independent per-point functions from `core` and
//! `diff`; the parallel and sequential paths call the same functions, so they
//! produce bit-identical results.

use super::Execution;
use crate::config::{ProjectionConfig, ShadeConfig};
use crate::core::math::compute_cov3d_point;
use crate::core::sh::evaluate_sh_point;
use crate::core::{Camera, ShCoeffs};
use crate::diff::covariance_grad::compute_cov3d_point_grad;
use crate::diff::project_grad::project_point_grad_world;
use crate::diff::sh_grad::evaluate_sh_point_backward;
use crate::render::{Cov3dGrads, Projection, ShadeGrads, Shading};
use nalgebra::{Vector2, Vector3, Vector4};
use rayon::prelude::*;

/// Map `f` over `0..n`, in parallel or in order.
fn map_points<T, F>(exec: Execution, n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    match exec {
        Execution::Parallel => (0..n).into_par_iter().map(f).collect(),
        Execution::Sequential => (0..n).map(f).collect(),
    }
}

pub(super) fn project_forward(
    exec: Execution,
    positions: &[Vector3<f32>],
    camera: &Camera,
    config: &ProjectionConfig,
) -> Projection {
    let projected = map_points(exec, positions.len(), |i| {
        camera.project_point(&positions[i], config)
    });
    Projection::from_points(&projected)
}

pub(super) fn project_backward(
    exec: Execution,
    positions: &[Vector3<f32>],
    camera: &Camera,
    config: &ProjectionConfig,
    valid: &[bool],
    d_uv: &[Vector2<f32>],
    d_depth: &[f32],
) -> Vec<Vector3<f32>> {
    map_points(exec, positions.len(), |i| {
        let p = &positions[i];
        // Re-run the guard so a stale `valid` flag can never leak gradient.
        if !valid[i] || camera.project_point(p, config).is_none() {
            return Vector3::zeros();
        }
        project_point_grad_world(camera, config, p, &d_uv[i], d_depth[i])
    })
}

pub(super) fn shade_forward(
    exec: Execution,
    coeffs: &ShCoeffs,
    degree: u32,
    view_dirs: &[Vector3<f32>],
    visibility: &[bool],
    config: &ShadeConfig,
) -> Shading {
    let channels = coeffs.channels();
    let n = coeffs.num_points();
    let mut color = vec![0.0f32; n * channels];
    let mut clamped = vec![false; n * channels];

    let shade_one = |(i, (color, clamped)): (usize, (&mut [f32], &mut [bool]))| {
        if !visibility[i] {
            return;
        }
        evaluate_sh_point(
            coeffs.point(i),
            channels,
            degree,
            &view_dirs[i],
            config,
            color,
            clamped,
        );
    };

    match exec {
        Execution::Parallel => color
            .par_chunks_mut(channels)
            .zip(clamped.par_chunks_mut(channels))
            .enumerate()
            .for_each(shade_one),
        Execution::Sequential => color
            .chunks_mut(channels)
            .zip(clamped.chunks_mut(channels))
            .enumerate()
            .for_each(shade_one),
    }

    Shading {
        color,
        clamped,
        channels,
    }
}

pub(super) fn shade_backward(
    exec: Execution,
    coeffs: &ShCoeffs,
    degree: u32,
    view_dirs: &[Vector3<f32>],
    visibility: &[bool],
    clamped: &[bool],
    d_color: &[f32],
) -> ShadeGrads {
    let channels = coeffs.channels();
    let stride = coeffs.bands() * channels;
    let n = coeffs.num_points();
    let mut d_coeffs = vec![0.0f32; n * stride];
    let mut d_view_dirs = vec![Vector3::zeros(); n];

    let backward_one = |(i, (d_coeffs, d_dir)): (usize, (&mut [f32], &mut Vector3<f32>))| {
        if !visibility[i] {
            return;
        }
        let channel_range = i * channels..(i + 1) * channels;
        *d_dir = evaluate_sh_point_backward(
            coeffs.point(i),
            channels,
            degree,
            &view_dirs[i],
            &clamped[channel_range.clone()],
            &d_color[channel_range],
            d_coeffs,
        );
    };

    match exec {
        Execution::Parallel => d_coeffs
            .par_chunks_mut(stride)
            .zip(d_view_dirs.par_iter_mut())
            .enumerate()
            .for_each(backward_one),
        Execution::Sequential => d_coeffs
            .chunks_mut(stride)
            .zip(d_view_dirs.iter_mut())
            .enumerate()
            .for_each(backward_one),
    }

    ShadeGrads {
        // Same shape as the forward coefficients, so construction cannot fail.
        d_coeffs: ShCoeffs::from_parts(d_coeffs, n, coeffs.bands(), channels),
        d_view_dirs,
    }
}

pub(super) fn cov3d_forward(
    exec: Execution,
    scales: &[Vector3<f32>],
    quats: &[Vector4<f32>],
    visibility: &[bool],
) -> Vec<[f32; 6]> {
    map_points(exec, scales.len(), |i| {
        if visibility[i] {
            compute_cov3d_point(&scales[i], &quats[i])
        } else {
            [0.0; 6]
        }
    })
}

pub(super) fn cov3d_backward(
    exec: Execution,
    scales: &[Vector3<f32>],
    quats: &[Vector4<f32>],
    visibility: &[bool],
    d_cov: &[[f32; 6]],
) -> Cov3dGrads {
    let grads = map_points(exec, scales.len(), |i| {
        if visibility[i] {
            compute_cov3d_point_grad(&scales[i], &quats[i], &d_cov[i])
        } else {
            (Vector3::zeros(), Vector4::zeros())
        }
    });
    let (d_scales, d_quats) = grads.into_iter().unzip();
    Cov3dGrads { d_scales, d_quats }
}
