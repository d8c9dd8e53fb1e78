//! Serde data file structs for deli content and tuning.
//!
//! These structs define the on-disk format. Times are seconds and money is
//! in currency units, both as `f64`; they are converted to `Fixed64` and
//! cents when applied to the engine types. Every tuning field is optional
//! and falls back to the engine default.

use deli_core::catalog::Category;
use deli_core::config::ShiftConfig;
use deli_core::difficulty::Ramp;
use deli_core::fixed::{f64_to_fixed64, Cents};
use deli_core::sim::SimulationStrategy;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Currency units to cents, rounded to the nearest cent. Negative amounts
/// clamp to zero.
pub fn currency_to_cents(amount: f64) -> Cents {
    if amount.is_nan() || amount <= 0.0 {
        return 0;
    }
    (amount * 100.0).round() as Cents
}

// ===========================================================================
// Catalog
// ===========================================================================

/// An ingredient definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientData {
    pub name: String,
    pub category: Category,
    /// Price in currency units.
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentData {
    pub name: String,
}

/// The whole catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogData {
    pub ingredients: Vec<IngredientData>,
    #[serde(default)]
    pub treatments: Vec<TreatmentData>,
}

/// Starting stock by ingredient name.
pub type StockData = BTreeMap<String, u32>;

// ===========================================================================
// Tuning
// ===========================================================================

/// Overlay for [`ShiftConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TuningData {
    pub dock_capacity: Option<u16>,
    pub dock_spacing: Option<f64>,
    pub prep_capacity: Option<u16>,
    pub max_active_orders: Option<u32>,
    pub tray_spawn_secs: Option<f64>,
    pub shift_length: Option<f64>,
    pub event_history: Option<usize>,
    pub command_history: Option<usize>,
    pub seed: Option<u64>,
    pub simulation: Option<SimulationData>,
    pub ramp: RampScheduleData,
    pub patience: PatienceData,
    pub customer: TimingsData,
    pub orders: OrderRulesData,
    pub scoring: ScoringData,
    pub difficulty: DifficultyData,
}

/// `Fixed { hz }` or `Variable`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationData {
    Fixed { hz: u32 },
    Variable,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RampScheduleData {
    pub orders: Option<u32>,
    pub initial_delay: Option<f64>,
    pub inter_order_delay: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatienceData {
    pub base: Option<f64>,
    pub decay_per_minute: Option<f64>,
    pub min: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimingsData {
    pub arrive: Option<f64>,
    pub park: Option<f64>,
    pub eva_to_window: Option<f64>,
    pub eva_to_ship: Option<f64>,
    pub depart: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderRulesData {
    pub base_price: Option<f64>,
    pub treatment_price: Option<f64>,
    pub cheese_chance: Option<f64>,
    pub sauce_chance: Option<f64>,
    pub second_treatment_chance: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringData {
    pub max_misses: Option<u32>,
    pub penalty_rate: Option<f64>,
    pub wrong_penalty: Option<u64>,
    pub score_multiplier: Option<u32>,
    pub tip: TipData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TipData {
    pub fast_bonus: Option<f64>,
    pub fast_threshold: Option<f64>,
    pub combo_step: Option<f64>,
    pub combo_cap: Option<u32>,
}

/// A difficulty ramp is replaced whole, never field by field.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RampData {
    pub initial: f64,
    pub cap: f64,
    pub rate_per_minute: f64,
}

impl From<RampData> for Ramp {
    fn from(r: RampData) -> Self {
        Ramp::new(r.initial, r.cap, r.rate_per_minute)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DifficultyData {
    pub spawn_interval: Option<RampData>,
    pub max_toppings: Option<RampData>,
    pub treatment_chance: Option<RampData>,
    pub ambient_speed: Option<RampData>,
    pub spawn_jitter: Option<f64>,
    pub min_spawn_interval: Option<f64>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

fn set_fixed(target: &mut deli_core::Fixed64, value: Option<f64>) {
    if let Some(v) = value {
        *target = f64_to_fixed64(v);
    }
}

impl TuningData {
    /// Overlay every present field onto `config`.
    pub fn apply(&self, mut config: ShiftConfig) -> ShiftConfig {
        set(&mut config.dock_capacity, self.dock_capacity);
        set_fixed(&mut config.dock_spacing, self.dock_spacing);
        set(&mut config.prep_capacity, self.prep_capacity);
        set(&mut config.max_active_orders, self.max_active_orders);
        set_fixed(&mut config.tray_spawn_secs, self.tray_spawn_secs);
        set_fixed(&mut config.shift_length, self.shift_length);
        set(&mut config.event_history, self.event_history);
        set(&mut config.command_history, self.command_history);
        set(&mut config.seed, self.seed);
        match self.simulation {
            Some(SimulationData::Fixed { hz }) => config.strategy = SimulationStrategy::fixed_hz(hz),
            Some(SimulationData::Variable) => config.strategy = SimulationStrategy::Variable,
            None => {}
        }

        let ramp = &mut config.ramp;
        set(&mut ramp.orders, self.ramp.orders);
        set_fixed(&mut ramp.initial_delay, self.ramp.initial_delay);
        set_fixed(&mut ramp.inter_order_delay, self.ramp.inter_order_delay);

        let patience = &mut config.patience;
        set_fixed(&mut patience.base, self.patience.base);
        set_fixed(&mut patience.decay_per_minute, self.patience.decay_per_minute);
        set_fixed(&mut patience.min, self.patience.min);

        let t = &mut config.timings;
        set_fixed(&mut t.arrive, self.customer.arrive);
        set_fixed(&mut t.park, self.customer.park);
        set_fixed(&mut t.eva_to_window, self.customer.eva_to_window);
        set_fixed(&mut t.eva_to_ship, self.customer.eva_to_ship);
        set_fixed(&mut t.depart, self.customer.depart);

        let o = &mut config.orders;
        set(&mut o.base_price, self.orders.base_price.map(currency_to_cents));
        set(&mut o.treatment_price, self.orders.treatment_price.map(currency_to_cents));
        set_fixed(&mut o.cheese_chance, self.orders.cheese_chance);
        set_fixed(&mut o.sauce_chance, self.orders.sauce_chance);
        set_fixed(&mut o.second_treatment_chance, self.orders.second_treatment_chance);

        let s = &mut config.scoring;
        set(&mut s.max_misses, self.scoring.max_misses);
        set_fixed(&mut s.penalty_rate, self.scoring.penalty_rate);
        set(&mut s.wrong_penalty, self.scoring.wrong_penalty);
        set(&mut s.score_multiplier, self.scoring.score_multiplier);
        set_fixed(&mut s.tip.fast_bonus, self.scoring.tip.fast_bonus);
        set_fixed(&mut s.tip.fast_threshold, self.scoring.tip.fast_threshold);
        set_fixed(&mut s.tip.combo_step, self.scoring.tip.combo_step);
        set(&mut s.tip.combo_cap, self.scoring.tip.combo_cap);

        let d = &mut config.difficulty;
        set(&mut d.spawn_interval, self.difficulty.spawn_interval.map(Ramp::from));
        set(&mut d.max_toppings, self.difficulty.max_toppings.map(Ramp::from));
        set(&mut d.treatment_chance, self.difficulty.treatment_chance.map(Ramp::from));
        set(&mut d.ambient_speed, self.difficulty.ambient_speed.map(Ramp::from));
        set_fixed(&mut d.spawn_jitter, self.difficulty.spawn_jitter);
        set_fixed(&mut d.min_spawn_interval, self.difficulty.min_spawn_interval);

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deli_core::Fixed64;

    #[test]
    fn currency_rounds_to_nearest_cent() {
        assert_eq!(currency_to_cents(2.0), 200);
        assert_eq!(currency_to_cents(1.15), 115);
        assert_eq!(currency_to_cents(-3.0), 0);
        assert_eq!(currency_to_cents(f64::NAN), 0);
    }

    #[test]
    fn empty_tuning_changes_nothing() {
        let tuning: TuningData = toml::from_str("").unwrap();
        assert_eq!(tuning.apply(ShiftConfig::default()), ShiftConfig::default());
    }

    #[test]
    fn partial_tuning_overlays_only_named_fields() {
        let tuning: TuningData = toml::from_str(
            r#"
dock_capacity = 6
shift_length = 180.0
simulation = { fixed = { hz = 30 } }

[scoring]
max_misses = 5

[orders]
base_price = 2.5

[difficulty.spawn_interval]
initial = 10.0
cap = 4.0
rate_per_minute = -1.0
"#,
        )
        .unwrap();
        let base = ShiftConfig::default();
        let config = tuning.apply(base.clone());

        assert_eq!(config.dock_capacity, 6);
        assert_eq!(config.shift_length, Fixed64::from_num(180));
        assert_eq!(config.strategy, SimulationStrategy::fixed_hz(30));
        assert_eq!(config.scoring.max_misses, 5);
        assert_eq!(config.scoring.wrong_penalty, base.scoring.wrong_penalty);
        assert_eq!(config.orders.base_price, 250);
        assert_eq!(config.difficulty.spawn_interval, Ramp::new(10.0, 4.0, -1.0));
        assert_eq!(config.difficulty.ambient_speed, base.difficulty.ambient_speed);
        assert_eq!(config.prep_capacity, base.prep_capacity);
    }

    #[test]
    fn variable_strategy_from_ron() {
        let tuning: TuningData = ron::from_str("(simulation: Some(variable))").unwrap();
        let config = tuning.apply(ShiftConfig::default());
        assert_eq!(config.strategy, SimulationStrategy::Variable);
    }

    #[test]
    fn catalog_categories_are_snake_case() {
        let data: CatalogData = serde_json::from_str(
            r#"{"ingredients": [{"name": "bread_white", "category": "bread", "price": 0.5}]}"#,
        )
        .unwrap();
        assert_eq!(data.ingredients[0].category, Category::Bread);
        assert!(data.treatments.is_empty());
    }
}
