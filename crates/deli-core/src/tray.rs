//! Tray state machine and placement validation.
//!
//! ```text
//! spawning -> awaiting_customer -> active -> completed -> delivered -> done
//!                                        \-------------> missed ----/
//! ```
//!
//! Placement is strictly sequential: the only valid ingredient is the next
//! one on the ticket. A rejected placement never mutates the tray, so
//! `placed` is always a prefix of the ticket.

use crate::fixed::{Fixed64, Ticks};
use crate::id::{CustomerId, DockSlotId, IngredientId, PrepSlotId, TreatmentId};
use crate::order::Order;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrayState {
    /// Sliding onto the prep slot.
    Spawning,
    /// Ticket is up; the customer has not reached the window yet.
    AwaitingCustomer,
    /// Accepting placements.
    Active,
    /// Everything placed and applied; waiting for the player to deliver.
    Completed,
    Delivered,
    Missed,
    /// Resolved and about to be removed from the arena.
    Done,
}

/// Result tag returned to the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Valid,
    Wrong,
    /// Nothing happened: the player dropped what they held.
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tray {
    pub order_num: u32,
    pub order: Order,
    placed: Vec<IngredientId>,
    applied: BTreeSet<TreatmentId>,
    state: TrayState,
    pub dock_slot: DockSlotId,
    pub prep_slot: PrepSlotId,
    pub customer: CustomerId,
    pub spawned_at: Ticks,
    spawn_timer: Fixed64,
    scored: bool,
}

impl Tray {
    pub fn new(
        order_num: u32,
        order: Order,
        dock_slot: DockSlotId,
        prep_slot: PrepSlotId,
        customer: CustomerId,
        spawned_at: Ticks,
        spawn_secs: Fixed64,
    ) -> Self {
        Self {
            order_num,
            order,
            placed: Vec::new(),
            applied: BTreeSet::new(),
            state: TrayState::Spawning,
            dock_slot,
            prep_slot,
            customer,
            spawned_at,
            spawn_timer: spawn_secs,
            scored: false,
        }
    }

    pub fn state(&self) -> TrayState {
        self.state
    }

    pub fn placed(&self) -> &[IngredientId] {
        &self.placed
    }

    pub fn applied_treatments(&self) -> &BTreeSet<TreatmentId> {
        &self.applied
    }

    pub fn is_completed(&self) -> bool {
        self.state == TrayState::Completed
    }

    pub fn is_scored(&self) -> bool {
        self.scored
    }

    /// The ingredient the ticket asks for next, if any.
    pub fn expected_next(&self) -> Option<IngredientId> {
        self.order.ingredients.get(self.placed.len()).copied()
    }

    /// Treatments still outstanding, in id order.
    pub fn pending_treatments(&self) -> impl Iterator<Item = TreatmentId> + '_ {
        self.order.treatments.difference(&self.applied).copied()
    }

    /// Place `key` on top of the stack.
    pub fn try_place(&mut self, key: IngredientId) -> Verdict {
        if self.state != TrayState::Active {
            return Verdict::Wrong;
        }
        match self.expected_next() {
            Some(expected) if expected == key => {
                self.placed.push(key);
                self.check_completion();
                Verdict::Valid
            }
            _ => Verdict::Wrong,
        }
    }

    /// Apply a treatment the ticket asks for.
    pub fn apply_treatment(&mut self, key: TreatmentId) -> Verdict {
        if self.state != TrayState::Active
            || !self.order.treatments.contains(&key)
            || self.applied.contains(&key)
        {
            return Verdict::Wrong;
        }
        self.applied.insert(key);
        self.check_completion();
        Verdict::Valid
    }

    /// `placed == ingredients ∧ applied ⊇ treatments`.
    pub fn satisfies_order(&self) -> bool {
        self.placed.len() == self.order.ingredients.len() && self.applied.is_superset(&self.order.treatments)
    }

    fn check_completion(&mut self) {
        if self.state == TrayState::Active && self.satisfies_order() {
            self.state = TrayState::Completed;
        }
    }

    /// Advance the spawn-in timer. Returns true on the tick the tray
    /// becomes `awaiting_customer`.
    pub fn advance_spawn(&mut self, dt: Fixed64) -> bool {
        if self.state != TrayState::Spawning {
            return false;
        }
        self.spawn_timer -= dt;
        if self.spawn_timer <= Fixed64::ZERO {
            self.spawn_timer = Fixed64::ZERO;
            self.state = TrayState::AwaitingCustomer;
            return true;
        }
        false
    }

    /// The customer reached the window. Returns true if the tray became
    /// active. A tray still spawning waits for its next tick.
    pub fn customer_arrived(&mut self) -> bool {
        if self.state != TrayState::AwaitingCustomer {
            return false;
        }
        self.state = TrayState::Active;
        // An order with nothing to do would be complete immediately; the
        // generator never yields one, but keep the predicate authoritative.
        self.check_completion();
        true
    }

    /// Record delivery. Only a completed, unscored tray can be delivered;
    /// returns false otherwise.
    pub fn mark_delivered(&mut self) -> bool {
        if self.state != TrayState::Completed || self.scored {
            return false;
        }
        self.scored = true;
        self.state = TrayState::Delivered;
        true
    }

    /// Record a miss. A completed or already resolved tray cannot miss.
    pub fn mark_missed(&mut self) -> bool {
        match self.state {
            TrayState::Spawning | TrayState::AwaitingCustomer | TrayState::Active => {
                self.state = TrayState::Missed;
                true
            }
            TrayState::Completed | TrayState::Delivered | TrayState::Missed | TrayState::Done => false,
        }
    }

    pub fn mark_done(&mut self) {
        self.state = TrayState::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64;
    use slotmap::SlotMap;

    fn bread() -> IngredientId {
        IngredientId(0)
    }
    fn ham() -> IngredientId {
        IngredientId(1)
    }
    fn cheese() -> IngredientId {
        IngredientId(2)
    }
    fn toast() -> TreatmentId {
        TreatmentId(0)
    }

    fn tray_for(ingredients: Vec<IngredientId>, treatments: &[TreatmentId]) -> Tray {
        let mut sm = SlotMap::<CustomerId, ()>::with_key();
        let order = Order {
            ingredients,
            treatments: treatments.iter().copied().collect(),
            total_price: 500,
        };
        Tray::new(1, order, DockSlotId(0), PrepSlotId(0), sm.insert(()), 0, f64_to_fixed64(0.5))
    }

    fn active_tray(ingredients: Vec<IngredientId>, treatments: &[TreatmentId]) -> Tray {
        let mut tray = tray_for(ingredients, treatments);
        assert!(tray.advance_spawn(f64_to_fixed64(0.5)));
        assert!(tray.customer_arrived());
        tray
    }

    #[test]
    fn inactive_tray_rejects_everything() {
        let mut tray = tray_for(vec![bread(), ham(), bread()], &[toast()]);
        assert_eq!(tray.try_place(bread()), Verdict::Wrong);
        assert_eq!(tray.apply_treatment(toast()), Verdict::Wrong);
        assert!(tray.placed().is_empty());
    }

    #[test]
    fn wrong_first_ingredient_leaves_tray_untouched() {
        let mut tray = active_tray(vec![bread(), ham(), bread()], &[]);
        assert_eq!(tray.try_place(ham()), Verdict::Wrong);
        assert!(tray.placed().is_empty());
        assert_eq!(tray.expected_next(), Some(bread()));
    }

    #[test]
    fn full_sequence_completes() {
        let mut tray = active_tray(vec![bread(), ham(), bread()], &[]);
        assert_eq!(tray.try_place(bread()), Verdict::Valid);
        assert_eq!(tray.try_place(ham()), Verdict::Valid);
        assert!(!tray.is_completed());
        assert_eq!(tray.try_place(bread()), Verdict::Valid);
        assert!(tray.is_completed());
        assert_eq!(tray.expected_next(), None);
    }

    #[test]
    fn placing_past_the_end_is_wrong() {
        let mut tray = active_tray(vec![bread(), ham(), bread()], &[toast()]);
        for key in [bread(), ham(), bread()] {
            assert_eq!(tray.try_place(key), Verdict::Valid);
        }
        // Still active: the toast is outstanding.
        assert_eq!(tray.state(), TrayState::Active);
        assert_eq!(tray.try_place(bread()), Verdict::Wrong);
        assert_eq!(tray.placed().len(), 3);
    }

    #[test]
    fn treatment_completes_after_ingredients() {
        let mut tray = active_tray(vec![bread(), ham(), bread()], &[toast()]);
        for key in [bread(), ham(), bread()] {
            tray.try_place(key);
        }
        assert_eq!(tray.apply_treatment(toast()), Verdict::Valid);
        assert!(tray.is_completed());
    }

    #[test]
    fn treatment_before_ingredients_still_counts() {
        let mut tray = active_tray(vec![bread(), cheese(), bread()], &[toast()]);
        assert_eq!(tray.apply_treatment(toast()), Verdict::Valid);
        assert!(!tray.is_completed());
        for key in [bread(), cheese(), bread()] {
            tray.try_place(key);
        }
        assert!(tray.is_completed());
    }

    #[test]
    fn unrequested_or_repeated_treatment_is_wrong() {
        let mut tray = active_tray(vec![bread(), ham(), bread()], &[toast()]);
        assert_eq!(tray.apply_treatment(TreatmentId(1)), Verdict::Wrong);
        assert_eq!(tray.apply_treatment(toast()), Verdict::Valid);
        assert_eq!(tray.apply_treatment(toast()), Verdict::Wrong);
        assert_eq!(tray.applied_treatments().len(), 1);
    }

    #[test]
    fn pending_treatments_shrink() {
        let mut tray = active_tray(vec![bread(), ham(), bread()], &[TreatmentId(0), TreatmentId(1)]);
        assert_eq!(tray.pending_treatments().count(), 2);
        tray.apply_treatment(TreatmentId(1));
        assert_eq!(tray.pending_treatments().collect::<Vec<_>>(), vec![TreatmentId(0)]);
    }

    #[test]
    fn delivery_only_once_and_only_when_completed() {
        let mut tray = active_tray(vec![bread(), ham(), bread()], &[]);
        assert!(!tray.mark_delivered());
        for key in [bread(), ham(), bread()] {
            tray.try_place(key);
        }
        assert!(tray.mark_delivered());
        assert!(tray.is_scored());
        assert!(!tray.mark_delivered());
    }

    #[test]
    fn completed_tray_cannot_miss() {
        let mut tray = active_tray(vec![bread(), ham(), bread()], &[]);
        for key in [bread(), ham(), bread()] {
            tray.try_place(key);
        }
        assert!(!tray.mark_missed());
        assert_eq!(tray.state(), TrayState::Completed);
    }

    #[test]
    fn spawn_timer_accumulates_across_ticks() {
        let mut tray = tray_for(vec![bread(), ham(), bread()], &[]);
        assert!(!tray.advance_spawn(f64_to_fixed64(0.25)));
        assert!(!tray.customer_arrived());
        assert!(tray.advance_spawn(f64_to_fixed64(0.25)));
        assert_eq!(tray.state(), TrayState::AwaitingCustomer);
        assert!(!tray.advance_spawn(f64_to_fixed64(1.0)));
    }
}
