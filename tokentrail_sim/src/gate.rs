// Interaction distance gate.
//
// A pure predicate over (target cell, player cell): an action is permitted
// iff **both** axis distances are within the interaction radius — Chebyshev
// box distance, not Euclidean, so the reachable region is a square. The
// gate is consulted synchronously before every action and re-evaluated for
// every materialized cell after any player movement (driving the dimmed vs.
// active visual state).
//
// Rejections must explain themselves: `RangeCheck` carries the signed
// per-axis deltas and the radius so an out-of-range action can report
// exactly how far away the cell is, never fail silently.

use crate::types::CellIndex;
use serde::{Deserialize, Serialize};

/// True iff `cell` is within `radius` cells of `player` on both axes.
pub fn within_range(cell: CellIndex, player: CellIndex, radius: i32) -> bool {
    cell.chebyshev_distance(player) <= radius as u32
}

/// The full distance verdict for one (cell, player) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeCheck {
    /// Signed i-axis distance from player to cell.
    pub delta_i: i32,
    /// Signed j-axis distance from player to cell.
    pub delta_j: i32,
    /// The configured interaction radius.
    pub radius: i32,
}

impl RangeCheck {
    pub fn in_range(&self) -> bool {
        self.delta_i.unsigned_abs() <= self.radius as u32
            && self.delta_j.unsigned_abs() <= self.radius as u32
    }
}

/// Evaluate the gate for one target cell.
pub fn range_check(cell: CellIndex, player: CellIndex, radius: i32) -> RangeCheck {
    let (delta_i, delta_j) = cell.axis_deltas(player);
    RangeCheck {
        delta_i,
        delta_j,
        radius,
    }
}
