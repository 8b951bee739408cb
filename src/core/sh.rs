//! Spherical harmonics evaluation for view-dependent color.
//!
//! Each point stores a `[D, C]` block of coefficients (D basis functions, C
//! color channels). Evaluating at degree `n` uses the first `(n + 1)²`
//! coefficients; the rest are ignored.
//!
//! The basis uses the real SH sign convention of the 3DGS reference code, so
//! coefficients trained there evaluate to the same colors here.

use crate::config::ShadeConfig;
use crate::error::{check_len, Result, SplatError};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Highest supported SH degree.
pub const MAX_SH_DEGREE: u32 = 4;

/// Number of basis functions at `MAX_SH_DEGREE`.
pub const MAX_SH_BANDS: usize = 25;

pub const SH_C0: f32 = 0.282_094_791_773_878_14;
pub const SH_C1: f32 = 0.488_602_511_902_919_9;
pub const SH_C2: [f32; 5] = [
    1.092_548_430_592_079_2,
    -1.092_548_430_592_079_2,
    0.315_391_565_252_520_05,
    -1.092_548_430_592_079_2,
    0.546_274_215_296_039_6,
];
pub const SH_C3: [f32; 7] = [
    -0.590_043_589_926_643_5,
    2.890_611_442_640_554,
    -0.457_045_799_464_465_8,
    0.373_176_332_590_115_4,
    -0.457_045_799_464_465_8,
    1.445_305_721_320_277,
    -0.590_043_589_926_643_5,
];
pub const SH_C4: [f32; 9] = [
    2.503_342_941_796_704_6,
    -1.770_130_769_779_930_4,
    0.946_174_695_757_560_1,
    -0.669_046_543_557_289_2,
    0.105_785_546_915_204_31,
    -0.669_046_543_557_289_2,
    0.473_087_347_878_780_04,
    -1.770_130_769_779_930_4,
    0.625_835_735_449_176_1,
];

/// Number of basis functions used by an SH expansion of `degree`.
pub fn num_bands(degree: u32) -> usize {
    let n = degree as usize + 1;
    n * n
}

/// Check that `degree` is supported and fits in `bands` stored coefficients.
pub fn validate_degree(degree: u32, bands: usize) -> Result<()> {
    if degree > MAX_SH_DEGREE {
        return Err(SplatError::InvalidArgument(format!(
            "SH degree {degree} exceeds the supported maximum {MAX_SH_DEGREE}"
        )));
    }
    let needed = num_bands(degree);
    if needed > bands {
        return Err(SplatError::InvalidArgument(format!(
            "SH degree {degree} needs {needed} coefficients per channel, only {bands} available"
        )));
    }
    Ok(())
}

/// Per-point SH coefficients stored as a flat `[P, D, C]` array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShCoeffs {
    data: Vec<f32>,
    num_points: usize,
    bands: usize,
    channels: usize,
}

impl ShCoeffs {
    /// Wrap a flat `[P, D, C]` buffer.
    pub fn new(data: Vec<f32>, num_points: usize, bands: usize, channels: usize) -> Result<Self> {
        if bands == 0 || channels == 0 {
            return Err(SplatError::InvalidArgument(format!(
                "SH coefficients need at least one band and one channel, got D={bands} C={channels}"
            )));
        }
        check_len("SH coefficients", num_points * bands * channels, data.len())?;
        Ok(Self {
            data,
            num_points,
            bands,
            channels,
        })
    }

    /// Wrap a buffer whose length the caller already guarantees.
    pub(crate) fn from_parts(data: Vec<f32>, num_points: usize, bands: usize, channels: usize) -> Self {
        debug_assert_eq!(data.len(), num_points * bands * channels);
        Self {
            data,
            num_points,
            bands,
            channels,
        }
    }

    /// All-zero coefficients.
    pub fn zeros(num_points: usize, bands: usize, channels: usize) -> Result<Self> {
        Self::new(vec![0.0; num_points * bands * channels], num_points, bands, channels)
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Coefficient block of point `i` (`D * C` values, band-major).
    pub fn point(&self, i: usize) -> &[f32] {
        let stride = self.bands * self.channels;
        &self.data[i * stride..(i + 1) * stride]
    }

    pub fn get(&self, point: usize, band: usize, channel: usize) -> f32 {
        self.data[(point * self.bands + band) * self.channels + channel]
    }

    pub fn set(&mut self, point: usize, band: usize, channel: usize, value: f32) {
        self.data[(point * self.bands + band) * self.channels + channel] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// Evaluate the real SH basis functions up to `degree` at a unit direction.
///
/// Entries past `num_bands(degree)` are left at zero.
///
/// The basis functions are ordered by degree, then by order m = -l..=l.
pub fn sh_basis(degree: u32, dir: &Vector3<f32>) -> [f32; MAX_SH_BANDS] {
    let mut b = [0.0f32; MAX_SH_BANDS];
    b[0] = SH_C0;
    if degree == 0 {
        return b;
    }

    let (x, y, z) = (dir.x, dir.y, dir.z);
    b[1] = -SH_C1 * y;
    b[2] = SH_C1 * z;
    b[3] = -SH_C1 * x;
    if degree == 1 {
        return b;
    }

    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (xy, yz, xz) = (x * y, y * z, x * z);
    b[4] = SH_C2[0] * xy;
    b[5] = SH_C2[1] * yz;
    b[6] = SH_C2[2] * (2.0 * zz - xx - yy);
    b[7] = SH_C2[3] * xz;
    b[8] = SH_C2[4] * (xx - yy);
    if degree == 2 {
        return b;
    }

    b[9] = SH_C3[0] * y * (3.0 * xx - yy);
    b[10] = SH_C3[1] * xy * z;
    b[11] = SH_C3[2] * y * (4.0 * zz - xx - yy);
    b[12] = SH_C3[3] * z * (2.0 * zz - 3.0 * xx - 3.0 * yy);
    b[13] = SH_C3[4] * x * (4.0 * zz - xx - yy);
    b[14] = SH_C3[5] * z * (xx - yy);
    b[15] = SH_C3[6] * x * (xx - 3.0 * yy);
    if degree == 3 {
        return b;
    }

    b[16] = SH_C4[0] * xy * (xx - yy);
    b[17] = SH_C4[1] * yz * (3.0 * xx - yy);
    b[18] = SH_C4[2] * xy * (7.0 * zz - 1.0);
    b[19] = SH_C4[3] * yz * (7.0 * zz - 3.0);
    b[20] = SH_C4[4] * (zz * (35.0 * zz - 30.0) + 3.0);
    b[21] = SH_C4[5] * xz * (7.0 * zz - 3.0);
    b[22] = SH_C4[6] * (xx - yy) * (7.0 * zz - 1.0);
    b[23] = SH_C4[7] * xz * (xx - 3.0 * yy);
    b[24] = SH_C4[8] * (xx * (xx - 3.0 * yy) - yy * (3.0 * xx - yy));
    b
}

/// Normalize a view direction, falling back to +z for a zero vector.
pub fn normalize_direction(dir: &Vector3<f32>) -> Vector3<f32> {
    dir.try_normalize(1e-12).unwrap_or_else(Vector3::z)
}

/// Evaluate one point's color.
///
/// `coeffs` is the point's `[D, C]` block; `color` and `clamped` have C entries.
/// Each channel is `sum_k Y_k(dir) * coeffs[k][c] + color_offset`, clamped from
/// below at `clamp_floor` with the corresponding flag set.
pub fn evaluate_sh_point(
    coeffs: &[f32],
    channels: usize,
    degree: u32,
    dir: &Vector3<f32>,
    config: &ShadeConfig,
    color: &mut [f32],
    clamped: &mut [bool],
) {
    let basis = sh_basis(degree, &normalize_direction(dir));

    for c in 0..channels {
        let mut acc = 0.0f32;
        for (k, b) in basis.iter().enumerate().take(num_bands(degree)) {
            acc += b * coeffs[k * channels + c];
        }
        acc += config.color_offset;

        if acc < config.clamp_floor {
            color[c] = config.clamp_floor;
            clamped[c] = true;
        } else {
            color[c] = acc;
            clamped[c] = false;
        }
    }
}
