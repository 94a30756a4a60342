// Player-visible events emitted by the session.
//
// Every observable consequence of a command or a position update is a
// `GameEvent`. The host UI renders exclusively from these (plus the menu
// model below) — the core never touches widgets. Events are emitted in
// deterministic order for a given command stream.
//
// `CellMenu` is the model behind the per-cell panel: a title (the cell's
// center coordinates, as the original panel displayed) and exactly one
// body — an action offer, an explanation of why nothing is offered, or the
// out-of-range notice with the measured distance.
//
// See also: `session.rs` for what emits which event, `command.rs` for the
// input side, `actions.rs` for `ActionRejection`.

use crate::actions::ActionRejection;
use crate::movement::BackendKind;
use crate::types::{CellIndex, TokenValue, WorldPos};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An observable consequence of processing one command or position update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The player moved (any backend, any distance).
    PlayerMoved { position: WorldPos, cell: CellIndex },
    /// The window cache re-derived the materialized set.
    WindowRecomputed {
        spawned: usize,
        evicted: usize,
        live: usize,
    },
    /// A cell was clicked; show its menu.
    MenuShown { menu: CellMenu },
    /// A token moved from a cell into the player's hand.
    TokenGrabbed { index: CellIndex, value: TokenValue },
    /// The held token moved into an empty cell.
    TokenPlaced { index: CellIndex, value: TokenValue },
    /// Two equal tokens merged; `value` is the new held value.
    TokensCrafted { index: CellIndex, value: TokenValue },
    /// An attempted action was refused. Carries its own explanation.
    ActionRejected {
        index: CellIndex,
        reason: ActionRejection,
    },
    /// The held-token display should refresh.
    HeldChanged { held: Option<TokenValue> },
    /// The status line should refresh.
    StatusChanged { line: String },
    /// A movement backend took over.
    BackendSwitched { kind: BackendKind },
    /// A backend could not start; movement stays on the discrete stepper.
    BackendFallback {
        attempted: BackendKind,
        reason: String,
    },
}

/// The per-cell panel model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellMenu {
    pub index: CellIndex,
    /// World-space center of the cell, for the panel title.
    pub center: WorldPos,
    pub body: MenuBody,
}

/// Exactly one of these per menu, chosen from the cell and hand state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuBody {
    /// Cell holds a token, hand is empty: offer the grab button.
    GrabOffer { value: TokenValue },
    /// Hand holds a token, cell is empty: offer the place button.
    PlaceOffer { held: TokenValue },
    /// Both hold the same value: offer the craft button.
    CraftOffer { value: TokenValue },
    /// Both hold tokens but the values differ: explain, offer nothing.
    Mismatch { held: TokenValue, cell: TokenValue },
    /// Neither holds anything.
    Empty,
    /// Cell is outside the interaction radius.
    TooFar {
        delta_i: i32,
        delta_j: i32,
        radius: i32,
    },
}

impl fmt::Display for MenuBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuBody::GrabOffer { .. } => write!(f, "Grab token"),
            MenuBody::PlaceOffer { held } => write!(f, "Place token ({held})"),
            MenuBody::CraftOffer { value } => write!(f, "Craft (merge {value} + {value})"),
            MenuBody::Mismatch { held, cell } => write!(
                f,
                "Cannot craft: held ({held}) and cell ({cell}) values must match."
            ),
            MenuBody::Empty => write!(f, "No token in this cell."),
            MenuBody::TooFar {
                delta_i,
                delta_j,
                radius,
            } => write!(
                f,
                "Too far to interact (distance: {delta_i}, {delta_j}). Move within {radius} cells."
            ),
        }
    }
}
