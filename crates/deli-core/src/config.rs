//! Tuning for one shift. Every field has a playable default; the data crate
//! overlays values read from a tuning file.

use crate::customer::{CustomerTimings, PatienceRules};
use crate::difficulty::DifficultyCurve;
use crate::fixed::{f64_to_fixed64, Fixed64};
use crate::order::OrderRules;
use crate::scoring::ScoringRules;
use crate::sim::SimulationStrategy;
use crate::spawn::SpawnRamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftConfig {
    pub dock_capacity: u16,
    /// Distance between neighbouring dock positions, in world units.
    pub dock_spacing: Fixed64,
    pub prep_capacity: u16,
    pub max_active_orders: u32,
    pub tray_spawn_secs: Fixed64,
    /// Game seconds after which an open store starts closing. Zero means
    /// the shift runs until closed by hand.
    pub shift_length: Fixed64,
    pub ramp: SpawnRamp,
    pub patience: PatienceRules,
    pub timings: CustomerTimings,
    pub orders: OrderRules,
    pub scoring: ScoringRules,
    pub difficulty: DifficultyCurve,
    pub strategy: SimulationStrategy,
    /// Delivered events kept for late readers.
    pub event_history: usize,
    /// Executed commands kept for debugging. Zero disables history.
    pub command_history: usize,
    pub seed: u64,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            dock_capacity: 4,
            dock_spacing: f64_to_fixed64(3.0),
            prep_capacity: 3,
            max_active_orders: 3,
            tray_spawn_secs: f64_to_fixed64(0.5),
            shift_length: Fixed64::ZERO,
            ramp: SpawnRamp::default(),
            patience: PatienceRules::default(),
            timings: CustomerTimings::default(),
            orders: OrderRules::default(),
            scoring: ScoringRules::default(),
            difficulty: DifficultyCurve::default(),
            strategy: SimulationStrategy::default(),
            event_history: 256,
            command_history: 0,
            seed: 0x0DE1_1CA7,
        }
    }
}

impl ShiftConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_strategy(mut self, strategy: SimulationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// How many trays may be in flight at once: the smallest of the two
    /// pools and the order limit.
    pub fn effective_order_limit(&self) -> u32 {
        self.max_active_orders
            .min(self.dock_capacity as u32)
            .min(self.prep_capacity as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_house_rules() {
        let config = ShiftConfig::default();
        assert_eq!(config.dock_capacity, 4);
        assert_eq!(config.prep_capacity, 3);
        assert_eq!(config.scoring.max_misses, 3);
        assert_eq!(config.scoring.wrong_penalty, 25);
        assert_eq!(config.scoring.score_multiplier, 10);
        assert_eq!(config.ramp.orders, 3);
        assert_eq!(config.effective_order_limit(), 3);
    }

    #[test]
    fn order_limit_respects_smallest_pool() {
        let config = ShiftConfig {
            prep_capacity: 1,
            ..ShiftConfig::default()
        };
        assert_eq!(config.effective_order_limit(), 1);
    }
}
