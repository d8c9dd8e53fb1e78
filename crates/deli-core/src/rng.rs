//! Deterministic PRNG injected into order generation and spawn jitter.
//!
//! SplitMix64. The whole state is one `u64`, which the desync hash reads.

use crate::fixed::Fixed64;

/// SplitMix64 pseudo-random number generator.
///
/// Seeded once per shift so a replayed shift produces the same tickets.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform fraction in `[0, 1)`.
    pub fn next_fraction(&mut self) -> Fixed64 {
        // The upper 32 bits become the fractional bits of a Q32.32 value
        // whose integer part is zero.
        let upper = self.next_u64() >> 32;
        Fixed64::from_bits(upper as i64)
    }

    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    pub fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        let upper = self.next_u64() >> 32;
        ((upper * bound as u64) >> 32) as u32
    }

    /// Uniform integer in `[lo, hi]`. Returns `lo` when `hi <= lo`.
    pub fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_below(hi - lo + 1)
    }

    /// Pick a uniformly random element.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_below(items.len() as u32) as usize;
        items.get(idx)
    }

    /// Remove and return a uniformly random element.
    pub fn take<T>(&mut self, items: &mut Vec<T>) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_below(items.len() as u32) as usize;
        Some(items.swap_remove(idx))
    }

    /// Returns `true` with the given probability (Fixed64 in [0, 1]).
    ///
    /// - probability <= 0 always returns false
    /// - probability >= 1 always returns true
    pub fn chance(&mut self, probability: Fixed64) -> bool {
        if probability <= Fixed64::ZERO {
            return false;
        }
        if probability >= Fixed64::ONE {
            return true;
        }
        // For p in (0,1) the raw Q32.32 bits equal the fraction scaled to
        // [0, 2^32); compare against a uniform u32.
        let upper = self.next_u64() >> 32;
        let raw = probability.to_bits() as u64;
        upper < raw
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}
