//! Screen tile grid and the point-footprint/tile overlap test.
//!
//! A footprint is a circle of `radius` pixels around `uv`; the tiles it
//! touches are those of its clamped bounding rectangle. The same rectangle is
//! used to count overlaps and to emit keys, so the two always agree.

use crate::config::TileConfig;
use crate::error::{check_len, Result, SplatError};
use nalgebra::Vector2;

/// Tile partition of a `width × height` image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

/// Half-open rectangle of tile coordinates `[min_x, max_x) × [min_y, max_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRect {
    pub fn area(&self) -> u32 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }

    /// Tile coordinates inside the rectangle, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32)> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..self.max_y).flat_map(move |ty| (min_x..max_x).map(move |tx| (tx, ty)))
    }
}

impl TileGrid {
    pub fn new(width: u32, height: u32, config: &TileConfig) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(SplatError::InvalidArgument(format!(
                "image size must be positive, got {width}x{height}"
            )));
        }
        let tile_size = config.tile_size;
        let tiles_x = width.div_ceil(tile_size);
        let tiles_y = height.div_ceil(tile_size);
        // Tile ids occupy the high 32 bits of an intersection key.
        if tiles_x.checked_mul(tiles_y).is_none() {
            return Err(SplatError::InvalidArgument(format!(
                "{tiles_x}x{tiles_y} tiles overflow the u32 tile id range"
            )));
        }
        Ok(Self {
            width,
            height,
            tile_size,
            tiles_x,
            tiles_y,
        })
    }

    pub fn num_tiles(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    pub fn tile_id(&self, tx: u32, ty: u32) -> u32 {
        ty * self.tiles_x + tx
    }

    /// Tiles touched by a footprint, clamped to the grid.
    ///
    /// Non-positive (or NaN) radii give an empty rectangle.
    pub fn tile_rect(&self, uv: &Vector2<f32>, radius: f32) -> TileRect {
        if !(radius > 0.0) {
            return TileRect {
                min_x: 0,
                min_y: 0,
                max_x: 0,
                max_y: 0,
            };
        }

        let ts = self.tile_size as f32;
        let clamp = |v: f32, hi: u32| -> u32 { (v.floor().max(0.0) as u32).min(hi) };

        let min_x = clamp((uv.x - radius) / ts, self.tiles_x);
        let min_y = clamp((uv.y - radius) / ts, self.tiles_y);
        let max_x = clamp((uv.x + radius + ts - 1.0) / ts, self.tiles_x);
        let max_y = clamp((uv.y + radius + ts - 1.0) / ts, self.tiles_y);

        TileRect {
            min_x,
            min_y,
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
        }
    }
}

/// Number of tiles each footprint touches.
pub fn count_tile_overlaps(uv: &[Vector2<f32>], radius: &[f32], grid: &TileGrid) -> Result<Vec<u32>> {
    check_len("radius", uv.len(), radius.len())?;
    Ok(uv
        .iter()
        .zip(radius)
        .map(|(uv, &r)| grid.tile_rect(uv, r).area())
        .collect())
}

/// Inclusive running total of `counts`; the last entry is the intersection count.
pub fn inclusive_prefix_sum(counts: &[u32]) -> Result<Vec<u32>> {
    let mut total = 0u32;
    counts
        .iter()
        .map(|&c| {
            total = total.checked_add(c).ok_or_else(|| {
                SplatError::InvalidArgument("total tile intersections overflow u32".to_string())
            })?;
            Ok(total)
        })
        .collect()
}
