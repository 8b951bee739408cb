//! Gradients for point projection.
//!
//! Forward op (in `core/camera.rs`):
//! - `p_cam = R p + t` (view transform)
//! - `depth = p_cam.z`
//! - Intrinsics mapping: `u = fx * x/z + cx`, `v = fy * y/z + cy`
//! - NDC mapping: `clip = P [p_cam; 1]`, `ndc = clip.xy / (clip.w + ε)`,
//!   `u = ((ndc_x + 1) W - 1) / 2`
//!
//! Camera matrices and intrinsics are constants; only the world position
//! receives a gradient.

use crate::config::{PixelMapping, ProjectionConfig};
use crate::core::camera::{Camera, CameraIntrinsics, CLIP_W_EPSILON};
use nalgebra::{Vector2, Vector3, Vector4};

/// Gradient of `CameraIntrinsics::to_pixel` w.r.t. the camera-space point.
pub fn pinhole_pixel_grad_point_cam(
    intrinsics: &CameraIntrinsics,
    p_cam: &Vector3<f32>,
    d_uv: &Vector2<f32>,
) -> Vector3<f32> {
    let z_inv = 1.0 / p_cam.z;
    let d_u = d_uv.x * intrinsics.fx * z_inv;
    let d_v = d_uv.y * intrinsics.fy * z_inv;
    Vector3::new(d_u, d_v, -(d_u * p_cam.x + d_v * p_cam.y) * z_inv)
}

/// Gradient of the NDC pixel mapping w.r.t. `point_cam`.
///
/// Backprop:
/// - du/dndc_x = W / 2, dv/dndc_y = H / 2
/// - ndc = clip.xy * w_inv, so dclip.xy = dndc * w_inv and
///   dclip.w = -(dndc · clip.xy) * w_inv²
/// - dp_cam = (Pᵀ dclip).xyz
pub fn ndc_pixel_grad_point_cam(camera: &Camera, point_cam: &Vector3<f32>, d_uv: &Vector2<f32>) -> Vector3<f32> {
    let clip = camera.camera_to_clip(point_cam);
    let w_inv = 1.0 / (clip.w + CLIP_W_EPSILON);

    let d_ndc_x = d_uv.x * 0.5 * camera.width as f32;
    let d_ndc_y = d_uv.y * 0.5 * camera.height as f32;

    let d_clip = Vector4::new(
        d_ndc_x * w_inv,
        d_ndc_y * w_inv,
        0.0,
        -(d_ndc_x * clip.x + d_ndc_y * clip.y) * w_inv * w_inv,
    );

    (camera.proj.transpose() * d_clip).xyz()
}

/// Gradient of `Camera::project_point` w.r.t. the world position.
///
/// The caller is responsible for only calling this on points that passed the
/// near-plane and extent guards; excluded points have zero gradient.
pub fn project_point_grad_world(
    camera: &Camera,
    config: &ProjectionConfig,
    point_world: &Vector3<f32>,
    d_uv: &Vector2<f32>,
    d_depth: f32,
) -> Vector3<f32> {
    let p_cam = camera.world_to_camera(point_world);

    let mut d_p_cam = match config.pixel_mapping {
        PixelMapping::Intrinsics => pinhole_pixel_grad_point_cam(&camera.intrinsics, &p_cam, d_uv),
        PixelMapping::Ndc => ndc_pixel_grad_point_cam(camera, &p_cam, d_uv),
    };
    d_p_cam.z += d_depth;

    // p_cam = R p + t
    camera.view_rotation().transpose() * d_p_cam
}
