//! Tile binning and depth sorting.
//!
//! Pipeline:
//! 1. per-point overlap counts -> inclusive prefix sum (`tiles`)
//! 2. one `(tile, depth)` key per point/tile intersection (`keys`)
//! 3. global stable sort of the keys, point indices gathered along
//! 4. per-tile `[start, end)` ranges over the sorted list (`ranges`)
//!
//! The rasterizer then walks `point_indices[range]` per tile, front to back.

pub mod keys;
pub mod ranges;
pub mod tiles;

pub use keys::{build_keys, key_depth, key_tile, pack_key, Intersections};
pub use ranges::{compute_ranges, TileRange};
pub use tiles::{count_tile_overlaps, inclusive_prefix_sum, TileGrid, TileRect};

use crate::config::TileConfig;
use crate::error::{check_len, Result};
use log::debug;
use nalgebra::Vector2;
use rayon::prelude::*;

/// Intersections after the global sort.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortedIntersections {
    pub keys: Vec<u64>,
    pub point_indices: Vec<u32>,
}

/// Sort intersections by key; the point indices follow their keys.
///
/// Stable, so equal keys (same tile, same depth) keep emission order.
pub fn sort_intersections(intersections: Intersections) -> SortedIntersections {
    let Intersections { keys, point_indices } = intersections;
    let mut pairs: Vec<(u64, u32)> = keys.into_iter().zip(point_indices).collect();
    pairs.par_sort_by_key(|&(key, _)| key);
    let (keys, point_indices) = pairs.into_iter().unzip();
    SortedIntersections { keys, point_indices }
}

/// Sorted per-tile point lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileBins {
    pub grid: TileGrid,
    pub keys: Vec<u64>,
    pub point_indices: Vec<u32>,
    pub ranges: Vec<TileRange>,
}

impl TileBins {
    /// Point indices of tile `t`, nearest first. Empty for out-of-grid tiles.
    pub fn tile(&self, t: u32) -> &[u32] {
        match self.ranges.get(t as usize) {
            Some(range) => &self.point_indices[range.as_range()],
            None => &[],
        }
    }

    pub fn num_intersections(&self) -> usize {
        self.point_indices.len()
    }
}

/// Bin and sort projected points for a `width × height` image.
///
/// `tiles[i]` is the number of tiles point `i` overlaps, as computed by the
/// upstream footprint stage with the same rectangle test as
/// [`count_tile_overlaps`]. Excluded points must carry zero radius and zero
/// overlaps.
pub fn sort_gaussians(
    uv: &[Vector2<f32>],
    depth: &[f32],
    width: u32,
    height: u32,
    radius: &[f32],
    tiles: &[u32],
    config: &TileConfig,
) -> Result<TileBins> {
    let grid = TileGrid::new(width, height, config)?;
    check_len("tile counts", uv.len(), tiles.len())?;

    let cum_tiles_hit = inclusive_prefix_sum(tiles)?;
    let intersections = build_keys(uv, depth, &grid, radius, &cum_tiles_hit)?;
    let sorted = sort_intersections(intersections);
    let ranges = compute_ranges(&grid, &cum_tiles_hit, &sorted.keys)?;

    debug!(
        "binned {} points into {} intersections over {}x{} tiles",
        uv.len(),
        sorted.keys.len(),
        grid.tiles_x,
        grid.tiles_y
    );

    Ok(TileBins {
        grid,
        keys: sorted.keys,
        point_indices: sorted.point_indices,
        ranges,
    })
}
