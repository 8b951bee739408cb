//! Point projection stage: world positions -> pixel coordinates + depth.

use crate::backend::NumericalBackend;
use crate::config::ProjectionConfig;
use crate::core::camera::{ProjectedPoint, EXCLUDED_DEPTH};
use crate::core::Camera;
use crate::error::{check_len, Result};
use log::debug;
use nalgebra::{Vector2, Vector3};

/// Per-point projection results.
///
/// Points rejected by the near plane or extent guard have `valid == false`,
/// `uv == (0, 0)` and `depth == EXCLUDED_DEPTH`. Later stages must give them
/// zero radius and zero tile overlaps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection {
    pub uv: Vec<Vector2<f32>>,
    pub depth: Vec<f32>,
    pub valid: Vec<bool>,
}

impl Projection {
    pub(crate) fn from_points(points: &[Option<ProjectedPoint>]) -> Self {
        let mut out = Projection {
            uv: Vec::with_capacity(points.len()),
            depth: Vec::with_capacity(points.len()),
            valid: Vec::with_capacity(points.len()),
        };
        for p in points {
            match p {
                Some(p) => {
                    out.uv.push(p.uv);
                    out.depth.push(p.depth);
                    out.valid.push(true);
                }
                None => {
                    out.uv.push(Vector2::zeros());
                    out.depth.push(EXCLUDED_DEPTH);
                    out.valid.push(false);
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    pub fn num_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Copy of `radius` with excluded points forced to zero.
    pub fn mask_radii(&self, radius: &[f32]) -> Result<Vec<f32>> {
        check_len("radius", self.len(), radius.len())?;
        Ok(radius
            .iter()
            .zip(&self.valid)
            .map(|(&r, &valid)| if valid { r } else { 0.0 })
            .collect())
    }

    fn check_shape(&self, num_points: usize) -> Result<()> {
        check_len("projection uv", num_points, self.uv.len())?;
        check_len("projection depth", num_points, self.depth.len())?;
        check_len("projection valid mask", num_points, self.valid.len())
    }
}

/// Project every point through `camera`.
pub fn project<B: NumericalBackend + ?Sized>(
    backend: &B,
    positions: &[Vector3<f32>],
    camera: &Camera,
    config: &ProjectionConfig,
) -> Result<Projection> {
    camera.validate()?;
    config.validate()?;

    let projection = backend.project_forward(positions, camera, config);
    debug!(
        "projected {} points on {} backend, {} survived near/extent guards",
        positions.len(),
        backend.name(),
        projection.num_valid()
    );
    Ok(projection)
}

/// Gradient of a loss over (uv, depth) w.r.t. the world positions.
///
/// Excluded points get exactly zero.
pub fn project_backward<B: NumericalBackend + ?Sized>(
    backend: &B,
    positions: &[Vector3<f32>],
    camera: &Camera,
    config: &ProjectionConfig,
    projection: &Projection,
    d_uv: &[Vector2<f32>],
    d_depth: &[f32],
) -> Result<Vec<Vector3<f32>>> {
    camera.validate()?;
    config.validate()?;
    let n = positions.len();
    projection.check_shape(n)?;
    check_len("dL/duv", n, d_uv.len())?;
    check_len("dL/ddepth", n, d_depth.len())?;

    Ok(backend.project_backward(positions, camera, config, &projection.valid, d_uv, d_depth))
}
