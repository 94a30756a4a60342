// The rendering-surface contract.
//
// The game core is headless: everything visual happens behind this trait,
// implemented by the host (a map widget, a tile renderer, a test double).
// The core only ever asks for rectangular visuals with an optional
// persistent text label, restyles them between active and dimmed, and
// releases them on eviction.
//
// Visuals are deliberately optional per cell: a cell without a token has
// no visual at all — hit-testing routes clicks by cell index, not by
// visual, so an empty cell is still a valid placement target. The visual's
// lifetime is otherwise tied 1:1 to its cell's presence in the window
// cache.
//
// Release failures are survivable by contract: if the host already
// discarded a visual (e.g. tore down its layer mid-pan), the core logs and
// moves on — correctness lives in the data model, not the handles.

use crate::types::{CellBounds, CellIndex, WorldPos};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle to one host-side visual.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualId(pub u64);

/// A failure reported by the host surface. Never fatal to the core.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("visual {0:?} was already discarded by the host surface")]
    AlreadyDiscarded(VisualId),
}

/// Everything the core needs from the host rendering layer.
pub trait RenderSurface {
    /// Create a rectangle over `bounds` with a persistent text label
    /// showing the token value. Returns the handle for later restyling
    /// and release.
    fn create_token_visual(&mut self, index: CellIndex, bounds: CellBounds, label: &str)
    -> VisualId;

    /// Toggle a visual between active (in interaction range) and dimmed.
    fn set_visual_active(&mut self, id: VisualId, active: bool);

    /// Replace a visual's label text.
    fn set_visual_label(&mut self, id: VisualId, label: &str);

    /// Destroy a visual. Errors are swallowed by the caller.
    fn release_visual(&mut self, id: VisualId) -> Result<(), SurfaceError>;

    /// Move the player marker.
    fn move_player_marker(&mut self, position: WorldPos);
}

/// A surface that renders nothing. Useful for headless runs and benches.
#[derive(Debug, Default)]
pub struct NullSurface {
    next_id: u64,
}

impl RenderSurface for NullSurface {
    fn create_token_visual(
        &mut self,
        _index: CellIndex,
        _bounds: CellBounds,
        _label: &str,
    ) -> VisualId {
        self.next_id += 1;
        VisualId(self.next_id)
    }

    fn set_visual_active(&mut self, _id: VisualId, _active: bool) {}

    fn set_visual_label(&mut self, _id: VisualId, _label: &str) {}

    fn release_visual(&mut self, _id: VisualId) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn move_player_marker(&mut self, _position: WorldPos) {}
}
