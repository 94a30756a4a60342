// Token state machine: grab, place, craft.
//
// A pure transition function over the pair (cell token, held token). The
// session layer gates every attempt by interaction distance first
// (`gate.rs`), then calls `apply`; on success it writes the new cell token
// through to the overlay and updates the cell's visual. Nothing else in the
// repository may alter a cell's token or the holding register.
//
// The carry register is single-slot: at most one token in hand. Craft
// merges two equal tokens into one doubled held token and chains without
// bound unless a value ceiling is configured.
//
// See also: `session.rs` for gating and write-through, `config.rs` for
// `craft_value_ceiling`.

use crate::gate::RangeCheck;
use crate::types::{CellIndex, TokenValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three mutating actions a player can attempt on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenAction {
    /// Take the cell's token into the empty hand.
    Grab,
    /// Put the held token into the empty cell.
    Place,
    /// Merge the held token with an equal cell token into a doubled held token.
    Craft,
}

/// A rejected attempt. Every variant carries its own explanation; rejections
/// are surfaced to the player, never silently dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ActionRejection {
    #[error("too far to interact (distance: {delta_i}, {delta_j}); move within {radius} cells")]
    OutOfRange {
        delta_i: i32,
        delta_j: i32,
        radius: i32,
    },

    #[error("cell {index} is not on screen")]
    NotMaterialized { index: CellIndex },

    #[error("no token in this cell")]
    NothingHere,

    #[error("no token in hand")]
    NothingHeld,

    #[error("already holding a token; only one fits in hand")]
    HandsFull,

    #[error("cell already holds a token")]
    CellOccupied,

    #[error("cannot craft: held ({held}) and cell ({cell}) values must match")]
    ValueMismatch { held: TokenValue, cell: TokenValue },

    #[error("cannot craft: result {result} would exceed the ceiling {ceiling}")]
    CeilingExceeded { result: u64, ceiling: u64 },
}

impl From<RangeCheck> for ActionRejection {
    fn from(check: RangeCheck) -> Self {
        ActionRejection::OutOfRange {
            delta_i: check.delta_i,
            delta_j: check.delta_j,
            radius: check.radius,
        }
    }
}

/// The state pair after a successful transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub cell: Option<TokenValue>,
    pub holding: Option<TokenValue>,
}

/// Apply one action to a (cell, holding) pair.
///
/// Pure: returns the complete resulting pair or a rejection, never a
/// partial state. `ceiling` is the optional craft value ceiling; `None`
/// means crafting chains without bound.
pub fn apply(
    action: TokenAction,
    cell: Option<TokenValue>,
    holding: Option<TokenValue>,
    ceiling: Option<u64>,
) -> Result<Transition, ActionRejection> {
    match action {
        TokenAction::Grab => match (cell, holding) {
            (Some(v), None) => Ok(Transition {
                cell: None,
                holding: Some(v),
            }),
            (None, _) => Err(ActionRejection::NothingHere),
            (Some(_), Some(_)) => Err(ActionRejection::HandsFull),
        },
        TokenAction::Place => match (cell, holding) {
            (None, Some(v)) => Ok(Transition {
                cell: Some(v),
                holding: None,
            }),
            (_, None) => Err(ActionRejection::NothingHeld),
            (Some(_), Some(_)) => Err(ActionRejection::CellOccupied),
        },
        TokenAction::Craft => match (cell, holding) {
            (Some(v), Some(w)) if v == w => {
                let crafted = v.doubled();
                if let Some(ceiling) = ceiling
                    && crafted.get() > ceiling
                {
                    return Err(ActionRejection::CeilingExceeded {
                        result: crafted.get(),
                        ceiling,
                    });
                }
                Ok(Transition {
                    cell: None,
                    holding: Some(crafted),
                })
            }
            (Some(cell), Some(held)) => Err(ActionRejection::ValueMismatch { held, cell }),
            (None, Some(_)) => Err(ActionRejection::NothingHere),
            (_, None) => Err(ActionRejection::NothingHeld),
        },
    }
}
