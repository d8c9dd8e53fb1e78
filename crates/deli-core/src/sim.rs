//! Simulation strategy, clock state and the desync hash.
//!
//! Both strategies run the same step pipeline; they only differ in how a
//! wall-clock delta handed to `Shift::advance` turns into steps.

use crate::fixed::{f64_to_fixed64, Fixed64, Ticks};
use serde::{Deserialize, Serialize};

/// How the shift turns elapsed time into steps. Chosen at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationStrategy {
    /// One step per `advance`, of exactly the supplied delta.
    Variable,
    /// Deltas are accumulated and consumed in steps of `timestep` seconds;
    /// the remainder carries into the next call.
    Fixed { timestep: Fixed64 },
}

impl SimulationStrategy {
    /// Fixed steps at `hz` steps per second.
    pub fn fixed_hz(hz: u32) -> Self {
        let hz = hz.max(1);
        SimulationStrategy::Fixed {
            timestep: Fixed64::ONE / Fixed64::from_num(hz),
        }
    }
}

impl Default for SimulationStrategy {
    fn default() -> Self {
        SimulationStrategy::Fixed {
            timestep: f64_to_fixed64(1.0 / 60.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimState {
    /// Steps run since the shift was created. Never reset by restart.
    pub tick: Ticks,
    /// Unconsumed time in fixed mode.
    pub accumulator: Fixed64,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Result of one `Shift::advance` call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdvanceResult {
    pub steps_run: u64,
    /// Commands executed in the pre-tick phases of those steps.
    pub commands_run: usize,
    /// Events delivered in the post-tick phases.
    pub events_delivered: usize,
}

/// FNV-1a (64-bit) over the simulation state, for desync detection. Not
/// cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write(&[v as u8]);
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
