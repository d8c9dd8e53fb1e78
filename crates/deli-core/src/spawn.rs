//! Spawn scheduler: decides when the next tray may be created.
//!
//! The scheduler only owns the countdown. Gating on store state, free slots
//! and the active-order limit is the caller's job; it asks [`SpawnScheduler::ready`]
//! and reports back with [`SpawnScheduler::on_spawned`] once a tray really
//! exists. A skipped opportunity leaves the countdown at zero so the next
//! eligible tick retries.

use crate::fixed::{f64_to_fixed64, Fixed64};

/// The opening sequence that replaces the steady interval for the first
/// few orders of a shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRamp {
    /// How many orders use the ramp timing.
    pub orders: u32,
    pub initial_delay: Fixed64,
    pub inter_order_delay: Fixed64,
}

impl Default for SpawnRamp {
    fn default() -> Self {
        Self {
            orders: 3,
            initial_delay: f64_to_fixed64(2.0),
            inter_order_delay: f64_to_fixed64(4.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnScheduler {
    ramp: SpawnRamp,
    countdown: Fixed64,
    spawned: u32,
}

impl SpawnScheduler {
    pub fn new(ramp: SpawnRamp) -> Self {
        let countdown = ramp.initial_delay;
        Self {
            ramp,
            countdown,
            spawned: 0,
        }
    }

    pub fn ramp(&self) -> &SpawnRamp {
        &self.ramp
    }

    pub fn countdown(&self) -> Fixed64 {
        self.countdown
    }

    /// Orders spawned since the last reset.
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    pub fn in_ramp(&self) -> bool {
        self.spawned < self.ramp.orders
    }

    /// Run the countdown down by `dt`; it never goes below zero.
    pub fn tick(&mut self, dt: Fixed64) {
        self.countdown = (self.countdown - dt).max(Fixed64::ZERO);
    }

    pub fn ready(&self) -> bool {
        self.countdown <= Fixed64::ZERO
    }

    /// A tray was created. `steady_interval` is the (possibly jittered)
    /// difficulty interval, used once the ramp is exhausted.
    pub fn on_spawned(&mut self, steady_interval: Fixed64) {
        self.spawned = self.spawned.saturating_add(1);
        self.countdown = if self.in_ramp() {
            self.ramp.inter_order_delay
        } else {
            steady_interval
        };
    }

    /// A tray was delivered or missed. The next order is never further away
    /// than one ramp step.
    pub fn on_resolution(&mut self) {
        self.countdown = self.countdown.min(self.ramp.inter_order_delay);
    }

    /// Back to the opening sequence (shift start or restart).
    pub fn reset(&mut self) {
        self.countdown = self.ramp.initial_delay;
        self.spawned = 0;
    }
}

impl Default for SpawnScheduler {
    fn default() -> Self {
        Self::new(SpawnRamp::default())
    }
}
