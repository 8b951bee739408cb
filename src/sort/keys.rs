//! Intersection key construction.
//!
//! One key per (point, tile) pair: tile id in the high 32 bits, an
//! order-preserving encoding of depth in the low 32 bits. Plain `u64`
//! comparison therefore orders by tile first, then front-to-back.

use super::tiles::TileGrid;
use crate::core::math::{depth_from_ordered_bits, ordered_depth_bits};
use crate::error::{check_len, Result, SplatError};
use nalgebra::Vector2;
use rayon::prelude::*;

/// Pack a tile id and depth into a sortable key.
pub fn pack_key(tile_id: u32, depth: f32) -> u64 {
    ((tile_id as u64) << 32) | ordered_depth_bits(depth) as u64
}

pub fn key_tile(key: u64) -> u32 {
    (key >> 32) as u32
}

pub fn key_depth(key: u64) -> f32 {
    depth_from_ordered_bits(key as u32)
}

/// Unsorted intersection keys and their point-index payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Intersections {
    pub keys: Vec<u64>,
    pub point_indices: Vec<u32>,
}

impl Intersections {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Emit one key per tile each footprint overlaps.
///
/// `cum_tiles_hit` is the inclusive prefix sum of the per-point overlap counts;
/// point `i` writes its keys at `[cum[i-1], cum[i])`. A point that emits a
/// different number of keys than it reserved is reported as an internal fault.
pub fn build_keys(
    uv: &[Vector2<f32>],
    depth: &[f32],
    grid: &TileGrid,
    radius: &[f32],
    cum_tiles_hit: &[u32],
) -> Result<Intersections> {
    let n = uv.len();
    check_len("depth", n, depth.len())?;
    check_len("radius", n, radius.len())?;
    check_len("cumulative tile counts", n, cum_tiles_hit.len())?;
    if u32::try_from(n).is_err() {
        return Err(SplatError::InvalidArgument(format!(
            "{n} points exceed the u32 point index range"
        )));
    }

    let total = cum_tiles_hit.last().copied().unwrap_or(0);
    validate_prefix_sum(cum_tiles_hit)?;
    let mut keys = vec![0u64; total as usize];
    let mut point_indices = vec![0u32; total as usize];

    // Carve the outputs into each point's reserved slice.
    let mut slots = Vec::with_capacity(n);
    let mut key_rest = keys.as_mut_slice();
    let mut idx_rest = point_indices.as_mut_slice();
    let mut prev = 0u32;
    for (i, &cum) in cum_tiles_hit.iter().enumerate() {
        let count = (cum - prev) as usize;
        let (k, kr) = key_rest.split_at_mut(count);
        let (p, pr) = idx_rest.split_at_mut(count);
        key_rest = kr;
        idx_rest = pr;
        slots.push((i, k, p));
        prev = cum;
    }

    slots.into_par_iter().try_for_each(|(i, keys, indices)| {
        let rect = grid.tile_rect(&uv[i], radius[i]);
        let reserved = keys.len();
        let mut written = 0usize;
        for (tx, ty) in rect.tiles() {
            if written == reserved {
                return Err(overlap_mismatch(i, reserved, rect.area() as usize));
            }
            keys[written] = pack_key(grid.tile_id(tx, ty), depth[i]);
            indices[written] = i as u32;
            written += 1;
        }
        if written != reserved {
            return Err(overlap_mismatch(i, reserved, written));
        }
        Ok(())
    })?;

    Ok(Intersections {
        keys,
        point_indices,
    })
}

/// Reject a prefix sum that decreases anywhere, so every reserved slice
/// lies inside the output buffers.
fn validate_prefix_sum(cum_tiles_hit: &[u32]) -> Result<()> {
    let mut prev = 0u32;
    for (i, &cum) in cum_tiles_hit.iter().enumerate() {
        if cum < prev {
            return Err(SplatError::InternalFault(format!(
                "cumulative tile counts decrease at point {i} ({prev} -> {cum})"
            )));
        }
        prev = cum;
    }
    Ok(())
}

fn overlap_mismatch(point: usize, reserved: usize, emitted: usize) -> SplatError {
    SplatError::InternalFault(format!(
        "point {point} reserved {reserved} tile intersections but overlaps {emitted}"
    ))
}
