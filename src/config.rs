//! Per-stage settings.
//!
//! Everything here is plain data with serde derives so a settings file can be
//! loaded next to a camera JSON. Defaults match the values used by the 3DGS
//! reference pipeline (near = 0.2, extent = 1.3, 16×16 tiles, +0.5 color offset).

use crate::error::{Result, SplatError};
use serde::{Deserialize, Serialize};

/// How the extent guard treats a point whose NDC coordinate lies exactly on the bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardBound {
    /// Keep points with |ndc| == extent; reject only |ndc| > extent.
    #[default]
    Exclusive,
    /// Reject points with |ndc| >= extent.
    Inclusive,
}

impl GuardBound {
    /// Returns true when `ndc` is outside the guard.
    pub fn rejects(self, ndc: f32, extent: f32) -> bool {
        match self {
            GuardBound::Exclusive => ndc.abs() > extent,
            GuardBound::Inclusive => ndc.abs() >= extent,
        }
    }
}

/// How surviving points are mapped to pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelMapping {
    /// Pinhole intrinsics: `u = fx * x / z + cx`, `v = fy * y / z + cy`.
    #[default]
    Intrinsics,
    /// NDC of `proj * view * p` mapped to the image: `u = ((ndc_x + 1) * W - 1) / 2`.
    Ndc,
}

/// Settings for the point projection stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Points with camera-space z below this are excluded.
    pub near: f32,

    /// Points whose NDC x or y magnitude exceeds this are excluded.
    ///
    /// This is a numerical-stability cutoff for points far outside the
    /// frustum, not a hard clip at the image border.
    pub extent: f32,

    pub extent_bound: GuardBound,

    pub pixel_mapping: PixelMapping,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            near: 0.2,
            extent: 1.3,
            extent_bound: GuardBound::Exclusive,
            pixel_mapping: PixelMapping::Intrinsics,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.near.is_finite() || self.near <= 0.0 {
            return Err(SplatError::InvalidArgument(format!(
                "near plane must be finite and positive, got {}",
                self.near
            )));
        }
        if !self.extent.is_finite() || self.extent <= 0.0 {
            return Err(SplatError::InvalidArgument(format!(
                "extent must be finite and positive, got {}",
                self.extent
            )));
        }
        Ok(())
    }
}

/// Settings for SH color evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadeConfig {
    /// Constant added to every channel after the SH sum.
    pub color_offset: f32,

    /// Channels below this value are clamped to it and flagged.
    pub clamp_floor: f32,
}

impl Default for ShadeConfig {
    fn default() -> Self {
        Self {
            color_offset: 0.5,
            clamp_floor: 0.0,
        }
    }
}

impl ShadeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.color_offset.is_finite() || !self.clamp_floor.is_finite() {
            return Err(SplatError::InvalidArgument(
                "shading offset and clamp floor must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for tile binning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Tile edge length in pixels.
    pub tile_size: u32,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self { tile_size: 16 }
    }
}

impl TileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(SplatError::InvalidArgument(
                "tile size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// All stage settings in one document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub projection: ProjectionConfig,
    pub shading: ShadeConfig,
    pub tiles: TileConfig,
}

impl RenderSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: RenderSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.projection.validate()?;
        self.shading.validate()?;
        self.tiles.validate()
    }
}
