// Mapping between continuous world space and the discrete cell grid.
//
// Pure arithmetic, no state beyond the two frame-of-reference parameters
// (origin and cell size). Cell `(0, 0)` is centered on the origin — the
// player's starting location — and cell `(i, j)` is centered at
// `origin + (i, j) * cell_size`.
//
// Two quantizations coexist and must not be confused:
// - `cell_at` rounds to the **nearest** center, so a position anywhere
//   inside a cell's bounds maps back to that cell (round-trip stability).
// - `covering_range` floors viewport edges; combined with the padding
//   margin it always over-covers, never under-covers, the visible area.
//
// See also: `cache.rs`, which drives spawn/evict from `covering_range`,
// `config.rs` for the `cell_size`/`origin`/`window_padding` tunables.

use crate::types::{CellBounds, CellIndex, WorldPos};
use serde::{Deserialize, Serialize};

/// The world-to-grid frame: a fixed origin and a fixed square cell size.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridMapping {
    origin: WorldPos,
    cell_size: f64,
}

impl GridMapping {
    /// Panics if `cell_size` is not strictly positive.
    pub fn new(origin: WorldPos, cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive");
        Self { origin, cell_size }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// The cell containing `pos`: each axis divided by the cell size and
    /// rounded to the nearest integer, relative to the origin.
    pub fn cell_at(&self, pos: WorldPos) -> CellIndex {
        CellIndex::new(
            ((pos.x - self.origin.x) / self.cell_size).round() as i32,
            ((pos.y - self.origin.y) / self.cell_size).round() as i32,
        )
    }

    /// Center of a cell: `origin + index * cell_size`.
    pub fn center_of(&self, index: CellIndex) -> WorldPos {
        WorldPos::new(
            self.origin.x + index.i as f64 * self.cell_size,
            self.origin.y + index.j as f64 * self.cell_size,
        )
    }

    /// Axis-aligned footprint of a cell: a `cell_size` box centered on the
    /// cell's center.
    pub fn bounds_of(&self, index: CellIndex) -> CellBounds {
        let center = self.center_of(index);
        let half = self.cell_size / 2.0;
        CellBounds::new(
            WorldPos::new(center.x - half, center.y - half),
            WorldPos::new(center.x + half, center.y + half),
        )
    }

    /// The index range covering `viewport`, expanded by `padding` cells on
    /// every side. Padding below 1 is clamped up: at least one ring of
    /// off-screen cells is always materialized so small viewport shifts
    /// don't pop cells in at the edge.
    pub fn covering_range(&self, viewport: CellBounds, padding: i32) -> CellRange {
        let padding = padding.max(1);
        let i_min = ((viewport.min.x - self.origin.x) / self.cell_size).floor() as i32;
        let i_max = ((viewport.max.x - self.origin.x) / self.cell_size).floor() as i32;
        let j_min = ((viewport.min.y - self.origin.y) / self.cell_size).floor() as i32;
        let j_max = ((viewport.max.y - self.origin.y) / self.cell_size).floor() as i32;
        CellRange {
            i_min: i_min - padding,
            i_max: i_max + padding,
            j_min: j_min - padding,
            j_max: j_max + padding,
        }
    }
}

/// An inclusive rectangular range of cell indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub i_min: i32,
    pub i_max: i32,
    pub j_min: i32,
    pub j_max: i32,
}

impl CellRange {
    pub fn contains(&self, index: CellIndex) -> bool {
        index.i >= self.i_min
            && index.i <= self.i_max
            && index.j >= self.j_min
            && index.j <= self.j_max
    }

    /// All indices in the range, row-major (i outer, j inner).
    pub fn indices(&self) -> impl Iterator<Item = CellIndex> + use<> {
        let (i_min, i_max) = (self.i_min, self.i_max);
        let (j_min, j_max) = (self.j_min, self.j_max);
        (i_min..=i_max).flat_map(move |i| (j_min..=j_max).map(move |j| CellIndex::new(i, j)))
    }

    pub fn count(&self) -> usize {
        if self.i_max < self.i_min || self.j_max < self.j_min {
            return 0;
        }
        (self.i_max - self.i_min + 1) as usize * (self.j_max - self.j_min + 1) as usize
    }
}
