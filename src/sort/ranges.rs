//! Per-tile ranges over the sorted intersection list.

use super::keys::key_tile;
use super::tiles::TileGrid;
use crate::error::{Result, SplatError};
use std::ops::Range;

/// Half-open `[start, end)` slice of the sorted intersections owned by one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileRange {
    pub start: u32,
    pub end: u32,
}

impl TileRange {
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Locate each tile's contiguous run in `sorted_keys`.
///
/// Tiles with no intersections get an empty range positioned where they would
/// appear, so consecutive ranges tile `[0, total)` without gaps. Keys that
/// reference a tile outside the grid, keys that are not sorted by tile, or a
/// key count that disagrees with the last prefix-sum entry are internal faults.
pub fn compute_ranges(grid: &TileGrid, cum_tiles_hit: &[u32], sorted_keys: &[u64]) -> Result<Vec<TileRange>> {
    let total = cum_tiles_hit.last().copied().unwrap_or(0);
    if sorted_keys.len() != total as usize {
        return Err(SplatError::InternalFault(format!(
            "{} sorted keys but {} tile intersections were counted",
            sorted_keys.len(),
            total
        )));
    }

    let num_tiles = grid.num_tiles();
    let mut ranges = Vec::with_capacity(num_tiles as usize);
    let mut tile = 0u32;
    let mut start = 0u32;

    for (idx, &key) in sorted_keys.iter().enumerate() {
        let idx = idx as u32;
        let t = key_tile(key);
        if t >= num_tiles {
            return Err(SplatError::InternalFault(format!(
                "key {idx} names tile {t}, grid has {num_tiles}"
            )));
        }
        if t < tile {
            return Err(SplatError::InternalFault(format!(
                "keys not sorted by tile at {idx} (tile {t} after {tile})"
            )));
        }
        while tile < t {
            ranges.push(TileRange { start, end: idx });
            start = idx;
            tile += 1;
        }
    }
    while tile < num_tiles {
        ranges.push(TileRange { start, end: total });
        start = total;
        tile += 1;
    }

    Ok(ranges)
}
