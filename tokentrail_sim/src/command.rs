// Commands that drive the game session.
//
// All external stimuli reach the core as a `GameCommand` handed to
// `GameSession::handle` — viewport changes from the rendering surface,
// clicks routed by cell index, action-button presses, movement input.
// The session processes each command synchronously and to completion,
// returning the `GameEvent`s it produced. This is the only way outside
// code changes core state.
//
// See also: `session.rs` for the dispatch, `event.rs` for the output side.

use crate::actions::TokenAction;
use crate::movement::BackendKind;
use crate::types::{CellBounds, CellIndex, WorldPos};
use serde::{Deserialize, Serialize};

/// One external stimulus.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameCommand {
    /// The viewport moved or resized; re-derive the materialized window.
    ViewportChanged { bounds: CellBounds },
    /// A visual (or latent empty cell) was clicked.
    CellClicked { index: CellIndex },
    /// An action button was pressed on a cell's menu.
    Act {
        index: CellIndex,
        action: TokenAction,
    },
    /// Discrete movement: one cell width along one axis.
    Step { di: i32, dj: i32 },
    /// Direct relocation (the developer right-click path).
    Relocate { position: WorldPos },
    /// Hand movement over to a different backend.
    SwitchBackend { kind: BackendKind },
}
