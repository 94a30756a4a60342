// Viewport-driven sparse window cache.
//
// Only the cells covering the current viewport (plus a padding ring) exist
// in memory. As the viewport moves, `recompute` spawns cells entering the
// window and evicts cells leaving it. A spawned cell's content comes from
// the mutation overlay if the cell has diverged, else from the
// deterministic generator; an evicted cell's content is diffed against the
// generator and flushed to the overlay before its in-memory state is
// discarded entirely.
//
// The cache is the exclusive owner of both the materialized-cell map and
// the overlay. Every mutation flows through its methods: `recompute` for
// the window boundary, `apply_token_change` for the token state machine's
// write path. After any `recompute`, the live set equals exactly the
// padded covering range — no stray entries, no gaps — and calling it again
// with the same bounds is a no-op.
//
// Visuals are lazy: a cell only holds a host-surface visual while it holds
// a token (empty cells are hit-tested by index, not by visual). Visual
// release failures during eviction are logged and swallowed — the logical
// transition proceeds regardless.
//
// See also: `grid.rs` for the covering-range derivation, `overlay.rs` for
// the minimality invariant, `token_gen.rs` for content, `render.rs` for the
// surface contract, `session.rs` for who calls what.

use crate::config::GameConfig;
use crate::gate;
use crate::grid::{CellRange, GridMapping};
use crate::overlay::MutationOverlay;
use crate::render::{RenderSurface, VisualId};
use crate::token_gen::TokenGenerator;
use crate::types::{CellBounds, CellIndex, TokenValue};
use rustc_hash::FxHashMap;

/// The live, in-memory representation of one currently-visible cell.
#[derive(Clone, Copy, Debug)]
pub struct MaterializedCell {
    pub index: CellIndex,
    pub bounds: CellBounds,
    pub token: Option<TokenValue>,
    /// Present iff the cell currently holds a token.
    pub visual: Option<VisualId>,
}

/// What one `recompute` did, for status display and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecomputeStats {
    pub spawned: usize,
    pub evicted: usize,
    pub live: usize,
}

/// Materializes and evicts cells as the viewport moves.
#[derive(Debug)]
pub struct WindowCache {
    grid: GridMapping,
    generator: TokenGenerator,
    overlay: MutationOverlay,
    live: FxHashMap<CellIndex, MaterializedCell>,
    padding: i32,
    radius: i32,
    window: Option<CellRange>,
}

impl WindowCache {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            grid: GridMapping::new(config.origin, config.cell_size),
            generator: TokenGenerator::new(config),
            overlay: MutationOverlay::new(),
            live: FxHashMap::default(),
            padding: config.window_padding,
            radius: config.interaction_radius,
            window: None,
        }
    }

    /// Re-derive the materialized set for a new viewport: spawn every
    /// in-range cell not yet live, then evict every live cell that left
    /// the range (flushing its divergence to the overlay first).
    pub fn recompute(
        &mut self,
        viewport: CellBounds,
        player_cell: CellIndex,
        surface: &mut dyn RenderSurface,
    ) -> RecomputeStats {
        let range = self.grid.covering_range(viewport, self.padding);

        let mut spawned = 0;
        for index in range.indices() {
            if !self.live.contains_key(&index) {
                self.spawn_cell(index, player_cell, surface);
                spawned += 1;
            }
        }

        // Collect and sort departures so eviction order (and therefore any
        // surface traffic) is independent of hash-map iteration order.
        let mut departed: Vec<CellIndex> = self
            .live
            .keys()
            .filter(|index| !range.contains(**index))
            .copied()
            .collect();
        departed.sort_unstable();
        for index in &departed {
            self.evict_cell(*index, surface);
        }

        self.window = Some(range);
        RecomputeStats {
            spawned,
            evicted: departed.len(),
            live: self.live.len(),
        }
    }

    fn spawn_cell(
        &mut self,
        index: CellIndex,
        player_cell: CellIndex,
        surface: &mut dyn RenderSurface,
    ) {
        let generated = self.generator.generate(index).token;
        let token = self.overlay.effective_token(index, generated);
        let bounds = self.grid.bounds_of(index);
        let visual = token.map(|value| {
            let id = surface.create_token_visual(index, bounds, &value.to_string());
            surface.set_visual_active(id, gate::within_range(index, player_cell, self.radius));
            id
        });
        self.live.insert(
            index,
            MaterializedCell {
                index,
                bounds,
                token,
                visual,
            },
        );
    }

    fn evict_cell(&mut self, index: CellIndex, surface: &mut dyn RenderSurface) {
        let Some(cell) = self.live.remove(&index) else {
            return;
        };
        let generated = self.generator.generate(index).token;
        self.overlay.record(index, cell.token, generated);
        if let Some(id) = cell.visual
            && let Err(err) = surface.release_visual(id)
        {
            // Host already discarded the handle; the data model moves on.
            log::warn!("releasing visual for cell {index} failed: {err}");
        }
    }

    /// Restyle every materialized visual for a new player cell (dimmed vs.
    /// active). Called after every player movement.
    pub fn restyle_all(&self, player_cell: CellIndex, surface: &mut dyn RenderSurface) {
        let mut visuals: Vec<(CellIndex, VisualId)> = self
            .live
            .values()
            .filter_map(|cell| cell.visual.map(|id| (cell.index, id)))
            .collect();
        visuals.sort_unstable_by_key(|(index, _)| *index);
        for (index, id) in visuals {
            surface.set_visual_active(id, gate::within_range(index, player_cell, self.radius));
        }
    }

    /// The token state machine's write path: set a materialized cell's
    /// token, keep its visual in sync, and write the change through to the
    /// overlay so it survives eviction. No-op for cells outside the window
    /// (the session gates on materialization before transitioning).
    pub fn apply_token_change(
        &mut self,
        index: CellIndex,
        token: Option<TokenValue>,
        surface: &mut dyn RenderSurface,
    ) {
        let Some(cell) = self.live.get_mut(&index) else {
            return;
        };
        match (cell.visual, token) {
            (Some(id), None) => {
                if let Err(err) = surface.release_visual(id) {
                    log::warn!("releasing visual for cell {index} failed: {err}");
                }
                cell.visual = None;
            }
            (Some(id), Some(value)) => surface.set_visual_label(id, &value.to_string()),
            (None, Some(value)) => {
                let id = surface.create_token_visual(index, cell.bounds, &value.to_string());
                // An acted-on cell passed the gate, so it is in range.
                surface.set_visual_active(id, true);
                cell.visual = Some(id);
            }
            (None, None) => {}
        }
        cell.token = token;
        let generated = self.generator.generate(index).token;
        self.overlay.record(index, token, generated);
    }

    pub fn cell(&self, index: CellIndex) -> Option<&MaterializedCell> {
        self.live.get(&index)
    }

    pub fn is_materialized(&self, index: CellIndex) -> bool {
        self.live.contains_key(&index)
    }

    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    /// All materialized indices in sorted order.
    pub fn live_indices_sorted(&self) -> Vec<CellIndex> {
        let mut indices: Vec<CellIndex> = self.live.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn overlay(&self) -> &MutationOverlay {
        &self.overlay
    }

    pub fn window(&self) -> Option<CellRange> {
        self.window
    }
}
