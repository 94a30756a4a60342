// Data-driven game configuration.
//
// All tunable parameters live here in `GameConfig`, loadable from JSON at
// startup. Game logic never uses magic numbers — it reads from the config.
// This enables balance iteration without recompilation.
//
// The padding margin and the interaction radius are deliberately
// independent tunables: one controls how far off-screen cells stay
// materialized, the other how far the player can reach. Neither is derived
// from the other.
//
// See also: `session.rs` which owns the `GameConfig`, `token_gen.rs` for the
// generation parameters, `grid.rs` for the spatial frame.
//
// **Critical constraint: determinism.** `world_seed`, `spawn_probability`,
// and `max_value_exponent` feed directly into content generation. Two
// sessions with identical configs see identical worlds.

use crate::types::WorldPos;
use serde::{Deserialize, Serialize};

/// Complete game configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed string for deterministic content generation. Part of the world
    /// identity: two sessions share a world iff they share this seed.
    pub world_seed: String,

    /// Side length of one grid cell in world units. A host mapping world
    /// units to geographic degrees would use something like 1e-4.
    pub cell_size: f64,

    /// World-space location of the center of cell `(0, 0)` — the player's
    /// starting location.
    pub origin: WorldPos,

    /// Probability that an untouched cell spawns a token.
    pub spawn_probability: f64,

    /// Token values are `2^k` with `k` uniform in `0..=max_value_exponent`.
    /// The default of 3 yields values 1, 2, 4, 8.
    pub max_value_exponent: u32,

    /// How many cells away the player may interact (per-axis box distance).
    pub interaction_radius: i32,

    /// Extra rings of cells materialized beyond the visible viewport so
    /// small pans don't pop cells at the edge. Values below 1 are treated
    /// as 1.
    pub window_padding: i32,

    /// Optional upper bound on crafted token values. `None` (the default)
    /// lets craft chains double without limit; `Some(c)` rejects any craft
    /// whose result would exceed `c`.
    pub craft_value_ceiling: Option<u64>,

    /// Sampling cadence of the continuous movement backend, in
    /// milliseconds.
    pub stream_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_seed: "tokentrail".into(),
            cell_size: 1.0,
            origin: WorldPos::new(0.0, 0.0),
            spawn_probability: 0.1,
            max_value_exponent: 3,
            interaction_radius: 3,
            window_padding: 1,
            craft_value_ceiling: None,
            stream_interval_ms: 200,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roundtrips_through_json() {
        let config = GameConfig::default();
        let restored = GameConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored.world_seed, config.world_seed);
        assert_eq!(restored.cell_size, config.cell_size);
        assert_eq!(restored.interaction_radius, config.interaction_radius);
        assert_eq!(restored.craft_value_ceiling, None);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            GameConfig::from_json(r#"{"world_seed": "alt", "interaction_radius": 5}"#).unwrap();
        assert_eq!(config.world_seed, "alt");
        assert_eq!(config.interaction_radius, 5);
        // Unspecified fields take their defaults.
        assert_eq!(config.spawn_probability, 0.1);
        assert_eq!(config.window_padding, 1);
    }

    #[test]
    fn ceiling_is_expressible_in_json() {
        let config = GameConfig::from_json(r#"{"craft_value_ceiling": 2048}"#).unwrap();
        assert_eq!(config.craft_value_ceiling, Some(2048));
    }
}
