//! Difficulty curve: a pure function of elapsed game time.
//!
//! Every parameter is a [`Ramp`] that moves from its initial value toward a
//! cap at a fixed rate per minute and then holds. The only randomness is the
//! optional spawn-interval jitter, which draws from the injected
//! [`SimRng`].

use crate::fixed::{f64_to_fixed64, Fixed64};
use crate::rng::SimRng;

/// A value that progresses linearly from `initial` toward `cap`.
///
/// The direction is implied by the sign of `rate_per_minute`; a rate that
/// points away from the cap holds the initial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ramp {
    pub initial: Fixed64,
    pub cap: Fixed64,
    pub rate_per_minute: Fixed64,
}

impl Ramp {
    pub fn new(initial: f64, cap: f64, rate_per_minute: f64) -> Self {
        Self {
            initial: f64_to_fixed64(initial),
            cap: f64_to_fixed64(cap),
            rate_per_minute: f64_to_fixed64(rate_per_minute),
        }
    }

    /// Value after `minutes` of game time.
    pub fn at(&self, minutes: Fixed64) -> Fixed64 {
        let raw = self
            .initial
            .saturating_add(self.rate_per_minute.saturating_mul(minutes));
        if self.cap >= self.initial {
            raw.clamp(self.initial, self.cap)
        } else {
            raw.clamp(self.cap, self.initial)
        }
    }
}

/// Parameters read by the spawn scheduler, the order generator and the
/// customer machines for one moment of game time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyParams {
    /// Seconds between steady-state spawns.
    pub spawn_interval: Fixed64,
    /// Upper bound (inclusive) for toppings on one ticket.
    pub max_toppings: u32,
    /// Probability that a ticket carries a treatment.
    pub treatment_chance: Fixed64,
    /// Multiplier on ship transit speed.
    pub ambient_speed: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyCurve {
    pub spawn_interval: Ramp,
    pub max_toppings: Ramp,
    pub treatment_chance: Ramp,
    pub ambient_speed: Ramp,
    /// Fractional jitter applied to the spawn interval, e.g. 0.15 = ±15%.
    pub spawn_jitter: Fixed64,
    /// Floor under any jittered interval.
    pub min_spawn_interval: Fixed64,
}

impl Default for DifficultyCurve {
    fn default() -> Self {
        Self {
            spawn_interval: Ramp::new(12.0, 5.0, -0.75),
            max_toppings: Ramp::new(1.0, 4.0, 0.5),
            treatment_chance: Ramp::new(0.0, 0.5, 0.05),
            ambient_speed: Ramp::new(1.0, 2.0, 0.1),
            spawn_jitter: Fixed64::ZERO,
            min_spawn_interval: Fixed64::ONE,
        }
    }
}

impl DifficultyCurve {
    /// Sample every parameter at `elapsed_secs` of game time.
    pub fn sample(&self, elapsed_secs: Fixed64) -> DifficultyParams {
        let minutes = elapsed_secs.max(Fixed64::ZERO) / 60;
        DifficultyParams {
            spawn_interval: self.spawn_interval.at(minutes).max(self.min_spawn_interval),
            max_toppings: self.max_toppings.at(minutes).floor().to_num::<i64>().max(0) as u32,
            treatment_chance: self
                .treatment_chance
                .at(minutes)
                .clamp(Fixed64::ZERO, Fixed64::ONE),
            ambient_speed: self.ambient_speed.at(minutes).max(f64_to_fixed64(0.1)),
        }
    }

    /// The steady-state interval with jitter drawn from `rng`.
    ///
    /// With zero jitter no random number is consumed.
    pub fn jittered_interval(&self, params: &DifficultyParams, rng: &mut SimRng) -> Fixed64 {
        if self.spawn_jitter <= Fixed64::ZERO {
            return params.spawn_interval;
        }
        // u in [0,1) -> offset in [-jitter, +jitter)
        let u = rng.next_fraction();
        let offset = (u * 2 - Fixed64::ONE) * self.spawn_jitter;
        let interval = params.spawn_interval + params.spawn_interval * offset;
        interval.max(self.min_spawn_interval)
    }
}
