// Deterministic cell content generation.
//
// A cell's initial content is a pure function of its index and the world
// seed string — nothing is ever stored. Each decision gets its own keyed
// draw: `"{seed}:{i},{j}:spawn"` decides whether a token spawns at all,
// `"{seed}:{i},{j}:value"` decides which power of two it holds. The two
// draws are independent, so retuning the spawn probability never reshuffles
// the values of cells that still spawn.
//
// See also: `tokentrail_prng` for `GameRng::from_key` / `hash_key`,
// `overlay.rs` for where player mutations shadow generated content,
// `config.rs` for `world_seed` / `spawn_probability` / `max_value_exponent`.
//
// **Critical constraint: determinism.** `generate` must return identical
// results for identical `(world_seed, index)` across runs, processes, and
// platforms. No stored state, no side effects.

use crate::config::GameConfig;
use crate::types::{CellIndex, TokenValue};
use serde::{Deserialize, Serialize};
use tokentrail_prng::GameRng;

/// The content a cell holds if no player has ever touched it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialContent {
    pub token: Option<TokenValue>,
}

/// Pure generator: `(CellIndex) -> InitialContent`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenGenerator {
    world_seed: String,
    spawn_probability: f64,
    max_value_exponent: u32,
}

impl TokenGenerator {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            world_seed: config.world_seed.clone(),
            spawn_probability: config.spawn_probability,
            max_value_exponent: config.max_value_exponent,
        }
    }

    /// Initial content for a cell. Safe to call any number of times.
    pub fn generate(&self, index: CellIndex) -> InitialContent {
        if !self.draw(index, "spawn").random_bool(self.spawn_probability) {
            return InitialContent { token: None };
        }
        let exponent = self
            .draw(index, "value")
            .range_u32(0, self.max_value_exponent + 1);
        InitialContent {
            token: Some(TokenValue::from_exponent(exponent)),
        }
    }

    /// A throwaway generator keyed by `(world_seed, index, purpose)`.
    fn draw(&self, index: CellIndex, purpose: &str) -> GameRng {
        GameRng::from_key(&format!("{}:{}:{}", self.world_seed, index, purpose))
    }
}
