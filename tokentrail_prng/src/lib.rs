// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding,
// plus a stable FNV-1a string hash for deriving seeds from content keys.
// This is a hand-rolled implementation with zero external dependencies,
// chosen for portability and to guarantee identical output across all
// platforms.
//
// This crate is the single source of randomness for the entire Tokentrail
// project. World content is never stored: every cell's initial state is
// re-derived on demand by hashing a key string built from the cell's
// coordinates and a purpose tag ("spawn", "value", ...), seeding a
// throwaway generator from the hash, and drawing. Same key, same result,
// in any process, forever.
//
// **Critical constraint: determinism.** Every function in this crate must
// produce identical output for identical input, regardless of platform,
// compiler version, or optimization level. Do not use the stdlib hasher
// (randomly keyed per process), stdlib PRNG, or any source of
// non-determinism in this module.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG — the project's sole source of randomness.
///
/// Two generators created from the same seed (or the same key string, via
/// [`GameRng::from_key`]) produce identical output sequences.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Create a PRNG seeded from a string key.
    ///
    /// The key is reduced to a `u64` with [`hash_key`], so any generator
    /// built from the same key yields the same sequence. This is how cell
    /// content stays reproducible from coordinates alone: build the key,
    /// seed a throwaway generator, draw, discard.
    pub fn from_key(key: &str) -> Self {
        Self::new(hash_key(key))
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// Uses the upper 53 bits of a `u64` to fill the mantissa of an f64.
    /// 53 bits gives full f64 precision (IEEE 754 double has a 52-bit
    /// mantissa + 1 implicit bit).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        // Rejection sampling to avoid modulo bias.
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `u32` in `[low, high)`.
    ///
    /// Delegates to `range_u64` for the actual sampling.
    /// Panics if `low >= high`.
    pub fn range_u32(&mut self, low: u32, high: u32) -> u32 {
        self.range_u64(low as u64, high as u64) as u32
    }

    /// Return `true` with probability `p`, `false` otherwise.
    ///
    /// `p` should be in [0.0, 1.0]. Values outside this range are clamped:
    /// `p <= 0.0` always returns false, `p >= 1.0` always returns true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// FNV-1a 64-bit hash of a key string.
///
/// Fixed offset basis and prime from the FNV reference parameters, so the
/// mapping from key to seed is part of the world format: changing it
/// regenerates every cell in every world.
pub fn hash_key(key: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// SplitMix64 — used only for seeding xoshiro256++ from a single `u64`.
///
/// This is the standard recommendation from the xoshiro authors for
/// expanding a small seed into a larger state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
