//! Scoring and failure engine.
//!
//! Owns every number the HUD shows for the running shift plus the
//! termination record. Slot release and customer departure happen in the
//! shift engine; this module only does arithmetic.

use crate::fixed::{f64_to_fixed64, points_for, scale_cents, Cents, Fixed64, Ticks};
use crate::id::TrayId;
use serde::{Deserialize, Serialize};

/// How the tip multiplier is computed on delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipPolicy {
    /// Added when the customer still had at least `fast_threshold` of
    /// their patience left.
    pub fast_bonus: Fixed64,
    pub fast_threshold: Fixed64,
    /// Added per combo step, counted before this delivery.
    pub combo_step: Fixed64,
    pub combo_cap: u32,
}

impl Default for TipPolicy {
    fn default() -> Self {
        Self {
            fast_bonus: f64_to_fixed64(0.2),
            fast_threshold: f64_to_fixed64(0.5),
            combo_step: f64_to_fixed64(0.1),
            combo_cap: 5,
        }
    }
}

impl TipPolicy {
    /// A policy that always tips exactly 1.
    pub fn flat() -> Self {
        Self {
            fast_bonus: Fixed64::ZERO,
            fast_threshold: Fixed64::ONE,
            combo_step: Fixed64::ZERO,
            combo_cap: 0,
        }
    }

    pub fn multiplier(&self, patience_fraction: Fixed64, combo: u32) -> Fixed64 {
        let mut tip = Fixed64::ONE;
        if self.fast_bonus > Fixed64::ZERO && patience_fraction >= self.fast_threshold {
            tip += self.fast_bonus;
        }
        let steps = combo.min(self.combo_cap);
        tip.saturating_add(self.combo_step.saturating_mul(Fixed64::from_num(steps)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRules {
    pub max_misses: u32,
    /// Fraction of the shift's money forfeited on termination.
    pub penalty_rate: Fixed64,
    pub wrong_penalty: u64,
    /// Points per currency unit (100 cents).
    pub score_multiplier: u32,
    pub tip: TipPolicy,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            max_misses: 3,
            penalty_rate: f64_to_fixed64(0.5),
            wrong_penalty: 25,
            score_multiplier: 10,
            tip: TipPolicy::default(),
        }
    }
}

/// Outcome of a shift that hit the miss limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub tick: Ticks,
    /// Money earned this shift before the penalty.
    pub earned: Cents,
    pub penalty: Cents,
    /// `earned - penalty`, credited to the wallet.
    pub kept: Cents,
}

/// What a delivery was worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub tray: TrayId,
    pub order_num: u32,
    pub tip: Fixed64,
    pub money: Cents,
    pub points: u64,
    /// Combo after this delivery.
    pub combo: u32,
    pub new_high_score: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub current_score: u64,
    pub high_score: u64,
    pub combo: u32,
    pub best_combo: u32,
    pub missed_count: u32,
    pub money: Cents,
    pub orders_completed: u32,
    pub wrong_placements: u32,
    pub termination: Option<Termination>,
}

impl ScoreState {
    /// A fresh shift that remembers the all-time high score.
    pub fn with_high_score(high_score: u64) -> Self {
        Self {
            high_score,
            ..Self::default()
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn on_deliver(
        &mut self,
        rules: &ScoringRules,
        tray: TrayId,
        order_num: u32,
        total_price: Cents,
        patience_fraction: Fixed64,
    ) -> DeliveryReceipt {
        let tip = rules.tip.multiplier(patience_fraction, self.combo);
        let money = scale_cents(total_price, tip);
        let points = points_for(total_price, tip, rules.score_multiplier);

        self.orders_completed = self.orders_completed.saturating_add(1);
        self.money = self.money.saturating_add(money);
        self.current_score = self.current_score.saturating_add(points);
        self.combo = self.combo.saturating_add(1);
        self.best_combo = self.best_combo.max(self.combo);

        let new_high_score = self.current_score > self.high_score;
        if new_high_score {
            self.high_score = self.current_score;
        }

        DeliveryReceipt {
            tray,
            order_num,
            tip,
            money,
            points,
            combo: self.combo,
            new_high_score,
        }
    }

    /// Count a miss. Returns the termination record on the miss that
    /// reaches the limit; later calls are ignored.
    pub fn on_miss(&mut self, rules: &ScoringRules, tick: Ticks) -> Option<Termination> {
        if self.is_terminated() {
            return None;
        }
        self.missed_count = (self.missed_count + 1).min(rules.max_misses.max(1));
        self.combo = 0;

        if self.missed_count < rules.max_misses {
            return None;
        }
        let penalty = scale_cents(self.money, rules.penalty_rate).min(self.money);
        let termination = Termination {
            tick,
            earned: self.money,
            penalty,
            kept: self.money - penalty,
        };
        self.termination = Some(termination);
        Some(termination)
    }

    /// Subtract the wrong-placement penalty, floored at zero.
    pub fn on_wrong_placement(&mut self, rules: &ScoringRules) {
        self.current_score = self.current_score.saturating_sub(rules.wrong_penalty);
        self.wrong_placements = self.wrong_placements.saturating_add(1);
    }

    pub fn misses_left(&self, rules: &ScoringRules) -> u32 {
        rules.max_misses.saturating_sub(self.missed_count)
    }
}
