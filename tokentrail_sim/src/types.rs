// Core types shared across the game core.
//
// Defines the discrete grid coordinate (`CellIndex`), the continuous world
// coordinate (`WorldPos`), axis-aligned boxes (`CellBounds`), and the
// power-of-two token quantity (`TokenValue`). All types derive `Serialize`
// and `Deserialize` for config loading and state-snapshot tests.
//
// **Critical constraint: determinism.** Cell content is re-derived from
// `CellIndex` alone (see `token_gen.rs`), so the index's textual form — `"i,j"` —
// is part of the world format. Do not change `Display` without
// regenerating every world.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Grid coordinate
// ---------------------------------------------------------------------------

/// A discrete cell coordinate in the infinite grid.
///
/// The canonical key for every lookup: the mutation overlay, the
/// materialized-cell map, and content generation are all addressed by it.
/// The domain is unbounded on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex {
    pub i: i32,
    pub j: i32,
}

impl CellIndex {
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Signed per-axis deltas from `other` to `self`.
    pub fn axis_deltas(self, other: Self) -> (i32, i32) {
        (self.i - other.i, self.j - other.j)
    }

    /// Chebyshev (box) distance: the larger of the two axis distances.
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        let (di, dj) = self.axis_deltas(other);
        di.unsigned_abs().max(dj.unsigned_abs())
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.i, self.j)
    }
}

impl FromStr for CellIndex {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (i, j) = s.split_once(',').ok_or(())?;
        Ok(Self {
            i: i.parse().map_err(|_| ())?,
            j: j.parse().map_err(|_| ())?,
        })
    }
}

// Custom serde: serialize as the "i,j" string so CellIndex can be used as
// a JSON map key (serde_json requires string keys).
impl Serialize for CellIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CellIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| serde::de::Error::custom("invalid cell index, expected \"i,j\""))
    }
}

// ---------------------------------------------------------------------------
// Continuous world coordinate
// ---------------------------------------------------------------------------

/// A position in continuous world space.
///
/// `f64` because cell sizes can be tiny relative to coordinate magnitudes
/// (a host mapping world units to geographic degrees uses cells on the
/// order of 1e-4).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

impl WorldPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for WorldPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.x, self.y)
    }
}

/// An axis-aligned box in world space. Used both for cell footprints and
/// for viewport bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellBounds {
    pub min: WorldPos,
    pub max: WorldPos,
}

impl CellBounds {
    pub fn new(min: WorldPos, max: WorldPos) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> WorldPos {
        WorldPos::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Half-open containment: min edge inclusive, max edge exclusive, so
    /// adjacent cells never both claim a shared edge.
    pub fn contains(&self, pos: WorldPos) -> bool {
        pos.x >= self.min.x && pos.x < self.max.x && pos.y >= self.min.y && pos.y < self.max.y
    }
}

// ---------------------------------------------------------------------------
// Token quantity
// ---------------------------------------------------------------------------

/// A token quantity: a positive power of two.
///
/// Powers of two by construction — the generator only emits `2^k` and the
/// only arithmetic is [`TokenValue::doubled`], so the invariant holds
/// without runtime checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenValue(u64);

impl TokenValue {
    /// `2^exponent`. Panics if the exponent would overflow `u64`.
    pub const fn from_exponent(exponent: u32) -> Self {
        assert!(exponent < 64, "token exponent out of range");
        Self(1u64 << exponent)
    }

    /// The crafted result of merging two equal tokens.
    pub const fn doubled(self) -> Self {
        Self(self.0 << 1)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
