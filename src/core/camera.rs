//! Camera model (pinhole intrinsics, world->camera view, camera->clip projection).
//!
//! Cameras are used to:
//! - Project 3D points to pixel coordinates with a camera-space depth
//! - Reject points in front of the near plane or far outside the frustum
//! - Compute viewing directions for SH evaluation

use crate::config::{PixelMapping, ProjectionConfig};
use crate::error::{check_len, Result, SplatError};
use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Added to the clip-space w before the perspective divide.
pub const CLIP_W_EPSILON: f32 = 1e-7;

/// Depth written for points excluded by the near plane or the extent guard.
pub const EXCLUDED_DEPTH: f32 = 0.0;

/// Pinhole intrinsics in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in X (pixels)
    pub fx: f32,

    /// Focal length in Y (pixels)
    pub fy: f32,

    /// Principal point X (pixels)
    pub cx: f32,

    /// Principal point Y (pixels)
    pub cy: f32,
}

impl CameraIntrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Pinhole mapping of a camera-space point with `z > 0` to pixels.
    pub fn to_pixel(&self, p_cam: &Vector3<f32>) -> Vector2<f32> {
        Vector2::new(
            self.fx * p_cam.x / p_cam.z + self.cx,
            self.fy * p_cam.y / p_cam.z + self.cy,
        )
    }

    /// Horizontal field of view (radians) for an image of `width` pixels.
    pub fn fov_x(&self, width: u32) -> f32 {
        2.0 * (width as f32 / (2.0 * self.fx)).atan()
    }

    /// Vertical field of view (radians) for an image of `height` pixels.
    pub fn fov_y(&self, height: u32) -> f32 {
        2.0 * (height as f32 / (2.0 * self.fy)).atan()
    }
}

/// A pinhole camera with view and projection matrices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World -> camera transform (affine, bottom row `[0, 0, 0, 1]`).
    pub view: Matrix4<f32>,

    /// Camera -> clip transform.
    pub proj: Matrix4<f32>,

    pub intrinsics: CameraIntrinsics,

    /// Image width (pixels)
    pub width: u32,

    /// Image height (pixels)
    pub height: u32,
}

/// Projection of a single point that survived the near plane and extent guard.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedPoint {
    pub uv: Vector2<f32>,
    pub depth: f32,
}

/// Build a 3DGS-style perspective matrix (camera looks down +z, clip w = z).
pub fn perspective_from_fov(fov_x: f32, fov_y: f32, znear: f32, zfar: f32) -> Matrix4<f32> {
    let tan_half_x = (0.5 * fov_x).tan();
    let tan_half_y = (0.5 * fov_y).tan();

    let top = tan_half_y * znear;
    let right = tan_half_x * znear;

    let mut p = Matrix4::zeros();
    p[(0, 0)] = znear / right;
    p[(1, 1)] = znear / top;
    p[(2, 2)] = zfar / (zfar - znear);
    p[(2, 3)] = -(zfar * znear) / (zfar - znear);
    p[(3, 2)] = 1.0;
    p
}

/// Map an NDC coordinate in [-1, 1] to a pixel coordinate for an axis of `size` pixels.
pub fn ndc_to_pixel(ndc: f32, size: u32) -> f32 {
    ((ndc + 1.0) * size as f32 - 1.0) * 0.5
}

impl Camera {
    /// Create a camera, rejecting empty images.
    pub fn new(
        view: Matrix4<f32>,
        proj: Matrix4<f32>,
        intrinsics: CameraIntrinsics,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let camera = Self {
            view,
            proj,
            intrinsics,
            width,
            height,
        };
        camera.validate()?;
        Ok(camera)
    }

    /// Create a camera whose projection matrix is derived from the intrinsics,
    /// so NDC and intrinsics pixel mappings agree when the principal point is centered.
    pub fn pinhole(
        view: Matrix4<f32>,
        intrinsics: CameraIntrinsics,
        width: u32,
        height: u32,
        znear: f32,
        zfar: f32,
    ) -> Result<Self> {
        let proj = perspective_from_fov(
            intrinsics.fov_x(width),
            intrinsics.fov_y(height),
            znear,
            zfar,
        );
        Self::new(view, proj, intrinsics, width, height)
    }

    /// Build a camera from flat tensors: row-major 4×4 view and projection
    /// matrices and `[fx, fy, cx, cy]`.
    pub fn from_slices(
        view: &[f32],
        proj: &[f32],
        camparams: &[f32],
        width: i64,
        height: i64,
    ) -> Result<Self> {
        check_len("view matrix", 16, view.len())?;
        check_len("projection matrix", 16, proj.len())?;
        check_len("camera parameters", 4, camparams.len())?;
        if width <= 0 || height <= 0 {
            return Err(SplatError::InvalidArgument(format!(
                "image size must be positive, got {width}x{height}"
            )));
        }
        let width = u32::try_from(width)
            .map_err(|_| SplatError::InvalidArgument(format!("image width {width} too large")))?;
        let height = u32::try_from(height).map_err(|_| {
            SplatError::InvalidArgument(format!("image height {height} too large"))
        })?;

        Self::new(
            Matrix4::from_row_slice(view),
            Matrix4::from_row_slice(proj),
            CameraIntrinsics::new(camparams[0], camparams[1], camparams[2], camparams[3]),
            width,
            height,
        )
    }

    /// Parse a camera from JSON (the serde representation of this struct).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let camera: Camera = serde_json::from_str(json)?;
        camera.validate()?;
        Ok(camera)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SplatError::InvalidArgument(format!(
                "image size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Linear part of the view transform.
    pub fn view_rotation(&self) -> Matrix3<f32> {
        self.view.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation part of the view transform.
    pub fn view_translation(&self) -> Vector3<f32> {
        self.view.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Transform a point from world coordinates to camera coordinates.
    pub fn world_to_camera(&self, point_world: &Vector3<f32>) -> Vector3<f32> {
        self.view_rotation() * point_world + self.view_translation()
    }

    /// Transform a camera-space point to homogeneous clip coordinates.
    pub fn camera_to_clip(&self, point_camera: &Vector3<f32>) -> Vector4<f32> {
        self.proj * point_camera.push(1.0)
    }

    /// Get the camera center in world coordinates.
    ///
    /// C = -R^-1 * t; falls back to the rigid inverse (R^T) when R is singular.
    pub fn camera_center(&self) -> Vector3<f32> {
        let r = self.view_rotation();
        let t = self.view_translation();
        match r.try_inverse() {
            Some(r_inv) => -(r_inv * t),
            None => -(r.transpose() * t),
        }
    }

    /// Normalized viewing direction from the camera center to each point.
    ///
    /// A point sitting exactly on the camera center gets the +z axis.
    pub fn view_directions(&self, positions: &[Vector3<f32>]) -> Vec<Vector3<f32>> {
        let center = self.camera_center();
        positions
            .iter()
            .map(|p| (p - center).try_normalize(1e-12).unwrap_or_else(Vector3::z))
            .collect()
    }

    /// Project a world-space point.
    ///
    /// Returns `None` when the point is in front of the near plane or when its
    /// NDC coordinates fall outside the extent guard.
    pub fn project_point(
        &self,
        point_world: &Vector3<f32>,
        config: &ProjectionConfig,
    ) -> Option<ProjectedPoint> {
        let p_cam = self.world_to_camera(point_world);
        if !(p_cam.z > 0.0) || p_cam.z < config.near {
            return None;
        }

        let clip = self.camera_to_clip(&p_cam);
        let w_inv = 1.0 / (clip.w + CLIP_W_EPSILON);
        let ndc = Vector2::new(clip.x * w_inv, clip.y * w_inv);
        if !ndc.x.is_finite()
            || !ndc.y.is_finite()
            || config.extent_bound.rejects(ndc.x, config.extent)
            || config.extent_bound.rejects(ndc.y, config.extent)
        {
            return None;
        }

        let uv = match config.pixel_mapping {
            PixelMapping::Intrinsics => self.intrinsics.to_pixel(&p_cam),
            PixelMapping::Ndc => Vector2::new(
                ndc_to_pixel(ndc.x, self.width),
                ndc_to_pixel(ndc.y, self.height),
            ),
        };

        Some(ProjectedPoint {
            uv,
            depth: p_cam.z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_camera() -> Camera {
        Camera::pinhole(
            Matrix4::identity(),
            CameraIntrinsics::new(100.0, 100.0, 50.0, 50.0),
            100,
            100,
            0.01,
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn test_camera_projection() {
        let cam = test_camera();

        // (0.5, 0, 2) -> (100*0.5/2 + 50, 100*0/2 + 50) = (75, 50)
        let projected = cam
            .project_point(&Vector3::new(0.5, 0.0, 2.0), &ProjectionConfig::default())
            .unwrap();

        assert_relative_eq!(projected.uv.x, 75.0, epsilon = 1e-5);
        assert_relative_eq!(projected.uv.y, 50.0, epsilon = 1e-5);
        assert_relative_eq!(projected.depth, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_point_behind_camera() {
        let cam = test_camera();
        let world_point = Vector3::new(0.0, 0.0, -1.0);
        assert!(cam
            .project_point(&world_point, &ProjectionConfig::default())
            .is_none());
    }

    #[test]
    fn test_ndc_and_intrinsics_mappings_agree_for_centered_principal_point() {
        let cam = test_camera();
        let p = Vector3::new(0.3, -0.2, 3.0);
        let intr = cam.project_point(&p, &ProjectionConfig::default()).unwrap();
        let ndc = cam
            .project_point(
                &p,
                &ProjectionConfig {
                    pixel_mapping: PixelMapping::Ndc,
                    ..Default::default()
                },
            )
            .unwrap();

        // ndc_to_pixel has a half-pixel shift relative to the pinhole mapping.
        assert_relative_eq!(ndc.uv.x, intr.uv.x - 0.5, epsilon = 1e-3);
        assert_relative_eq!(ndc.uv.y, intr.uv.y - 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_camera_center_and_view_directions() {
        let mut view = Matrix4::identity();
        view[(0, 3)] = 1.0;
        view[(2, 3)] = 2.0;
        let cam = Camera::pinhole(
            view,
            CameraIntrinsics::new(100.0, 100.0, 50.0, 50.0),
            100,
            100,
            0.01,
            100.0,
        )
        .unwrap();

        assert_relative_eq!(cam.camera_center(), Vector3::new(-1.0, 0.0, -2.0), epsilon = 1e-6);

        let dirs = cam.view_directions(&[Vector3::new(-1.0, 0.0, 1.0), cam.camera_center()]);
        assert_relative_eq!(dirs[0], Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(dirs[1], Vector3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_from_slices_rejects_bad_shapes() {
        let ident: Vec<f32> = Matrix4::<f32>::identity().iter().copied().collect();
        let params = [100.0, 100.0, 50.0, 50.0];

        let err = Camera::from_slices(&ident[..12], &ident, &params, 100, 100);
        assert!(matches!(
            err,
            Err(SplatError::ShapeMismatch { expected: 16, actual: 12, .. })
        ));

        let err = Camera::from_slices(&ident, &ident, &params[..3], 100, 100);
        assert!(matches!(err, Err(SplatError::ShapeMismatch { .. })));

        let err = Camera::from_slices(&ident, &ident, &params, 0, 100);
        assert!(matches!(err, Err(SplatError::InvalidArgument(_))));

        let err = Camera::from_slices(&ident, &ident, &params, 100, -4);
        assert!(matches!(err, Err(SplatError::InvalidArgument(_))));
    }

    #[test]
    fn test_from_slices_is_row_major() {
        let mut view = [0.0f32; 16];
        view[0] = 1.0;
        view[5] = 1.0;
        view[10] = 1.0;
        view[15] = 1.0;
        view[3] = 7.0; // row 0, column 3: x translation
        let proj: Vec<f32> = Matrix4::<f32>::identity().iter().copied().collect();
        let cam = Camera::from_slices(&view, &proj, &[1.0, 1.0, 0.0, 0.0], 8, 8).unwrap();
        assert_relative_eq!(cam.view_translation(), Vector3::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn test_camera_json_roundtrip() {
        let cam = test_camera();
        let json = serde_json::to_string(&cam).unwrap();
        let back = Camera::from_json_str(&json).unwrap();
        assert_eq!(back, cam);
    }
}
