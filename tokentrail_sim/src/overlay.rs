// Sparse mutation overlay: the cells players have permanently changed.
//
// The world is regenerated from seed on demand, so the overlay is the only
// record of player mutations. It stays minimal by construction: an entry
// exists for an index **iff** the cell's current token differs from what
// the generator would produce there. `record` is the single entry point and
// enforces the invariant — a cell restored to its deterministic default has
// its entry deleted on the spot, never tombstoned.
//
// Only the window cache touches the overlay (on spawn reads, on despawn and
// write-through writes). Lookup is amortized O(1): worlds accumulate
// arbitrarily many scattered mutations and spawn-pass reads are per-cell.
//
// See also: `cache.rs` for the two boundary moments, `token_gen.rs` for the
// content being diffed against.

use crate::types::{CellIndex, TokenValue};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// The persisted divergence for one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayEntry {
    pub token: Option<TokenValue>,
}

/// Sparse store of diverged cells, keyed by index.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MutationOverlay {
    entries: FxHashMap<CellIndex, OverlayEntry>,
}

impl MutationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: CellIndex) -> Option<&OverlayEntry> {
        self.entries.get(&index)
    }

    /// The current token for a cell: its overlay entry if one exists,
    /// otherwise the generated default passed by the caller.
    pub fn effective_token(
        &self,
        index: CellIndex,
        generated: Option<TokenValue>,
    ) -> Option<TokenValue> {
        match self.entries.get(&index) {
            Some(entry) => entry.token,
            None => generated,
        }
    }

    /// Record a cell's live token, diffed against its generated default.
    ///
    /// Diverged tokens are stored (insert or update in place); a token equal
    /// to the default deletes any stale entry, keeping the overlay minimal.
    pub fn record(
        &mut self,
        index: CellIndex,
        live: Option<TokenValue>,
        generated: Option<TokenValue>,
    ) {
        if live == generated {
            self.entries.remove(&index);
        } else {
            self.entries.insert(index, OverlayEntry { token: live });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
