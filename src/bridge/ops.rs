//! Bridge wrappers around the `render` stages.

use super::{Function, SlotGrad};
use crate::backend::NumericalBackend;
use crate::config::{ProjectionConfig, ShadeConfig};
use crate::core::{Camera, ShCoeffs};
use crate::error::Result;
use crate::render::{self, Projection, Shading};
use nalgebra::{Vector2, Vector3, Vector4};

/// World positions -> pixel coordinates + depth.
pub struct ProjectPoints;

#[derive(Clone, Debug)]
pub struct ProjectInputs {
    pub positions: Vec<Vector3<f32>>,
    pub camera: Camera,
    pub config: ProjectionConfig,
}

pub struct ProjectSaved {
    pub positions: Vec<Vector3<f32>>,
    pub camera: Camera,
    pub config: ProjectionConfig,
    pub projection: Projection,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectOutputGrads {
    pub d_uv: Vec<Vector2<f32>>,
    pub d_depth: Vec<f32>,
}

impl Function for ProjectPoints {
    const NAME: &'static str = "project_points";
    const SLOTS: &'static [&'static str] = &[
        "positions",
        "view_matrix",
        "proj_matrix",
        "intrinsics",
        "width",
        "height",
        "near",
        "extent",
    ];

    type Inputs = ProjectInputs;
    type Outputs = Projection;
    type Saved = ProjectSaved;
    type OutputGrads = ProjectOutputGrads;

    fn forward<B: NumericalBackend + ?Sized>(backend: &B, inputs: &ProjectInputs) -> Result<(Projection, ProjectSaved)> {
        let projection = render::project(backend, &inputs.positions, &inputs.camera, &inputs.config)?;
        let saved = ProjectSaved {
            positions: inputs.positions.clone(),
            camera: inputs.camera.clone(),
            config: inputs.config,
            projection: projection.clone(),
        };
        Ok((projection, saved))
    }

    fn backward<B: NumericalBackend + ?Sized>(
        backend: &B,
        saved: ProjectSaved,
        grads: ProjectOutputGrads,
    ) -> Result<Vec<SlotGrad>> {
        let d_positions = render::project_backward(
            backend,
            &saved.positions,
            &saved.camera,
            &saved.config,
            &saved.projection,
            &grads.d_uv,
            &grads.d_depth,
        )?;

        let mut slots = vec![SlotGrad::Positions(d_positions)];
        slots.resize(Self::SLOTS.len(), SlotGrad::None);
        Ok(slots)
    }
}

/// SH coefficients + view directions -> color.
pub struct ComputeSh;

#[derive(Clone, Debug)]
pub struct ShadeInputs {
    pub coeffs: ShCoeffs,
    pub degree: u32,
    pub view_dirs: Vec<Vector3<f32>>,
    /// `None` treats every point as visible.
    pub visibility: Option<Vec<bool>>,
    pub config: ShadeConfig,
}

pub struct ShadeSaved {
    pub coeffs: ShCoeffs,
    pub degree: u32,
    pub view_dirs: Vec<Vector3<f32>>,
    pub visibility: Vec<bool>,
    pub clamped: Vec<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShadeOutputGrads {
    /// Flat `[P, C]`.
    pub d_color: Vec<f32>,
}

impl Function for ComputeSh {
    const NAME: &'static str = "compute_sh";
    const SLOTS: &'static [&'static str] = &["sh_coeffs", "degree", "view_dirs", "visibility"];

    type Inputs = ShadeInputs;
    type Outputs = Shading;
    type Saved = ShadeSaved;
    type OutputGrads = ShadeOutputGrads;

    fn forward<B: NumericalBackend + ?Sized>(backend: &B, inputs: &ShadeInputs) -> Result<(Shading, ShadeSaved)> {
        let visibility = inputs
            .visibility
            .clone()
            .unwrap_or_else(|| vec![true; inputs.coeffs.num_points()]);
        let shading = render::shade(
            backend,
            &inputs.coeffs,
            inputs.degree,
            &inputs.view_dirs,
            &visibility,
            &inputs.config,
        )?;
        let saved = ShadeSaved {
            coeffs: inputs.coeffs.clone(),
            degree: inputs.degree,
            view_dirs: inputs.view_dirs.clone(),
            visibility,
            clamped: shading.clamped.clone(),
        };
        Ok((shading, saved))
    }

    fn backward<B: NumericalBackend + ?Sized>(
        backend: &B,
        saved: ShadeSaved,
        grads: ShadeOutputGrads,
    ) -> Result<Vec<SlotGrad>> {
        let g = render::shade_backward(
            backend,
            &saved.coeffs,
            saved.degree,
            &saved.view_dirs,
            &saved.visibility,
            &saved.clamped,
            &grads.d_color,
        )?;
        Ok(vec![
            SlotGrad::ShCoeffs(g.d_coeffs),
            SlotGrad::None,
            SlotGrad::ViewDirs(g.d_view_dirs),
            SlotGrad::None,
        ])
    }
}

/// Scales + rotations -> packed 3D covariance.
pub struct ComputeCov3d;

#[derive(Clone, Debug)]
pub struct Cov3dInputs {
    pub scales: Vec<Vector3<f32>>,
    pub quats: Vec<Vector4<f32>>,
    pub visibility: Vec<bool>,
}

pub type Cov3dSaved = Cov3dInputs;

#[derive(Clone, Debug, PartialEq)]
pub struct Cov3dOutputGrads {
    pub d_cov: Vec<[f32; 6]>,
}

impl Function for ComputeCov3d {
    const NAME: &'static str = "compute_cov3d";
    const SLOTS: &'static [&'static str] = &["scales", "quats", "visibility"];

    type Inputs = Cov3dInputs;
    type Outputs = Vec<[f32; 6]>;
    type Saved = Cov3dSaved;
    type OutputGrads = Cov3dOutputGrads;

    fn forward<B: NumericalBackend + ?Sized>(backend: &B, inputs: &Cov3dInputs) -> Result<(Vec<[f32; 6]>, Cov3dSaved)> {
        let cov = render::compute_cov3d(backend, &inputs.scales, &inputs.quats, &inputs.visibility)?;
        Ok((cov, inputs.clone()))
    }

    fn backward<B: NumericalBackend + ?Sized>(
        backend: &B,
        saved: Cov3dSaved,
        grads: Cov3dOutputGrads,
    ) -> Result<Vec<SlotGrad>> {
        let g = render::compute_cov3d_backward(backend, &saved.scales, &saved.quats, &saved.visibility, &grads.d_cov)?;
        Ok(vec![SlotGrad::Scales(g.d_scales), SlotGrad::Quats(g.d_quats), SlotGrad::None])
    }
}
