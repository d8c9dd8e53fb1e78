//! A scripted player.
//!
//! The autopilot works the oldest order first, hands over finished trays
//! before starting new layers, buys stock when the next layer has run out,
//! and now and then reaches for the wrong ingredient. It acts at most once
//! per reaction interval and draws its mistakes from its own [`SimRng`], so
//! a run is reproducible from the shift seed and the autopilot seed.

use deli_core::fixed::{f64_to_fixed64, Cents};
use deli_core::rng::SimRng;
use deli_core::{Fixed64, IngredientId, Pickup, Shift, TrayId, TrayState, Verdict};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotConfig {
    /// Seconds between two actions.
    pub reaction_secs: f64,
    /// Chance of placing a wrong ingredient instead of the right one.
    pub mistake_rate: f64,
    /// Units bought when the next layer is out of stock. 0 never buys.
    pub restock_quantity: u32,
    pub seed: u64,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            reaction_secs: 0.25,
            mistake_rate: 0.0,
            restock_quantity: 10,
            seed: 0x5eed,
        }
    }
}

/// One thing the autopilot did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Place { tray: TrayId, item: Pickup },
    Deliver { tray: TrayId },
    Restock { ingredient: IngredientId, quantity: u32 },
}

#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: SimRng,
    reaction: Fixed64,
    mistake_rate: Fixed64,
    restock_quantity: u32,
    cooldown: Fixed64,
    actions: u32,
    mistakes: u32,
    deliveries: u32,
    purchases: Cents,
}

impl Autopilot {
    pub fn new(config: &AutopilotConfig) -> Self {
        Self {
            rng: SimRng::new(config.seed),
            reaction: f64_to_fixed64(config.reaction_secs.max(0.0)),
            mistake_rate: f64_to_fixed64(config.mistake_rate.clamp(0.0, 1.0)),
            restock_quantity: config.restock_quantity,
            cooldown: Fixed64::ZERO,
            actions: 0,
            mistakes: 0,
            deliveries: 0,
            purchases: 0,
        }
    }

    /// Let `dt` seconds pass and act if the reaction interval is over.
    pub fn act(&mut self, shift: &mut Shift, dt: Fixed64) -> Option<Action> {
        self.cooldown = (self.cooldown - dt).max(Fixed64::ZERO);
        if self.cooldown > Fixed64::ZERO || shift.is_paused() || shift.is_terminated() {
            return None;
        }
        let action = self.choose(shift)?;
        self.perform(shift, action);
        self.cooldown = self.reaction;
        self.actions += 1;
        Some(action)
    }

    fn choose(&mut self, shift: &Shift) -> Option<Action> {
        let tray_id = Self::target(shift)?;
        let tray = shift.tray(tray_id)?;
        if tray.is_completed() {
            return Some(Action::Deliver { tray: tray_id });
        }

        if let Some(next) = tray.expected_next() {
            if !shift.inventory().has_stock(next) {
                let cost = shift
                    .catalog()
                    .price(next)
                    .saturating_mul(Cents::from(self.restock_quantity));
                if self.restock_quantity == 0 || cost > shift.wallet() {
                    trace!(ingredient = shift.catalog().ingredient_name(next), "out of stock, waiting");
                    return None;
                }
                return Some(Action::Restock {
                    ingredient: next,
                    quantity: self.restock_quantity,
                });
            }
            if self.mistake_rate > Fixed64::ZERO && self.rng.chance(self.mistake_rate) {
                let decoys: Vec<IngredientId> = shift
                    .catalog()
                    .ingredient_ids()
                    .filter(|&id| id != next && shift.inventory().has_stock(id))
                    .collect();
                if let Some(&decoy) = self.rng.pick(&decoys) {
                    return Some(Action::Place {
                        tray: tray_id,
                        item: Pickup::Ingredient(decoy),
                    });
                }
            }
            return Some(Action::Place {
                tray: tray_id,
                item: Pickup::Ingredient(next),
            });
        }

        tray.pending_treatments().next().map(|key| Action::Place {
            tray: tray_id,
            item: Pickup::Treatment(key),
        })
    }

    /// Finished trays first, then the oldest order being built.
    fn target(shift: &Shift) -> Option<TrayId> {
        shift
            .tray_ids()
            .into_iter()
            .filter_map(|id| shift.tray(id).map(|t| (id, t)))
            .filter(|(_, t)| matches!(t.state(), TrayState::Active | TrayState::Completed))
            .min_by_key(|(_, t)| (!t.is_completed(), t.order_num))
            .map(|(id, _)| id)
    }

    fn perform(&mut self, shift: &mut Shift, action: Action) {
        match action {
            Action::Place { tray, item } => {
                if shift.pick_up(item) == Verdict::Valid && shift.place(Some(tray)) == Verdict::Wrong {
                    self.mistakes += 1;
                }
            }
            Action::Deliver { tray } => match shift.deliver(tray) {
                Ok(_) => self.deliveries += 1,
                Err(err) => debug!(%err, "delivery refused"),
            },
            Action::Restock { ingredient, quantity } => match shift.purchase(ingredient, quantity) {
                Ok(cost) => self.purchases += cost,
                Err(err) => debug!(%err, "purchase refused"),
            },
        }
    }

    pub fn actions(&self) -> u32 {
        self.actions
    }

    /// Placements the shift rejected.
    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn deliveries(&self) -> u32 {
        self.deliveries
    }

    /// Cents spent on stock.
    pub fn purchases(&self) -> Cents {
        self.purchases
    }
}
