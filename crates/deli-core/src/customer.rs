//! Customer state machine.
//!
//! A customer is created when its ship is dispatched to a reserved dock
//! slot and runs:
//!
//! ```text
//! arriving -> parked -> eva_to_window -> at_window -> eva_to_ship -> departing -> gone
//! ```
//!
//! Every state except `at_window` is a timer. Ship transit (`arriving`,
//! `departing`) runs at the ambient speed; walking and parking run at real
//! time. Leftover time from a finished timer carries into the next state
//! within the same tick, so the outcome never depends on how the driver
//! slices its deltas.
//!
//! The customer never leaves the window on its own. Resolution (delivery or
//! miss) calls [`Customer::depart`]. The only thing the machine reports
//! upward is the patience expiry, once.

use crate::fixed::{f64_to_fixed64, Fixed64};
use crate::id::{DockSlotId, TrayId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerState {
    Arriving,
    Parked,
    EvaToWindow,
    AtWindow,
    EvaToShip,
    Departing,
    Gone,
}

/// Durations of every timed state, in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerTimings {
    pub arrive: Fixed64,
    pub park: Fixed64,
    pub eva_to_window: Fixed64,
    pub eva_to_ship: Fixed64,
    pub depart: Fixed64,
}

impl Default for CustomerTimings {
    fn default() -> Self {
        Self {
            arrive: f64_to_fixed64(3.0),
            park: f64_to_fixed64(0.5),
            eva_to_window: f64_to_fixed64(2.0),
            eva_to_ship: f64_to_fixed64(2.0),
            depart: f64_to_fixed64(2.0),
        }
    }
}

impl CustomerTimings {
    fn duration(&self, state: CustomerState) -> Fixed64 {
        match state {
            CustomerState::Arriving => self.arrive,
            CustomerState::Parked => self.park,
            CustomerState::EvaToWindow => self.eva_to_window,
            CustomerState::EvaToShip => self.eva_to_ship,
            CustomerState::Departing => self.depart,
            CustomerState::AtWindow | CustomerState::Gone => Fixed64::ZERO,
        }
    }
}

/// How much patience a newly spawned customer brings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatienceRules {
    pub base: Fixed64,
    pub decay_per_minute: Fixed64,
    pub min: Fixed64,
}

impl Default for PatienceRules {
    fn default() -> Self {
        Self {
            base: f64_to_fixed64(60.0),
            decay_per_minute: f64_to_fixed64(5.0),
            min: f64_to_fixed64(25.0),
        }
    }
}

impl PatienceRules {
    /// `clamp(base - elapsed_minutes * decay, min, base)`.
    pub fn patience_for(&self, elapsed_secs: Fixed64) -> Fixed64 {
        let minutes = elapsed_secs.max(Fixed64::ZERO) / 60;
        let raw = self
            .base
            .saturating_sub(minutes.saturating_mul(self.decay_per_minute));
        let floor = self.min.min(self.base);
        raw.clamp(floor, self.base)
    }
}

/// A state change observed during [`Customer::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CustomerState,
    pub to: CustomerState,
}

/// What one advance produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerTick {
    pub transitions: Vec<Transition>,
    /// Patience ran out while the order was unfinished. Reported once per
    /// customer.
    pub patience_expired: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// The order this customer came for; cleared on resolution.
    pub tray: Option<TrayId>,
    /// The dock slot this customer still holds, if nobody released it yet.
    pub dock_slot: Option<DockSlotId>,
    state: CustomerState,
    patience_max: Fixed64,
    patience: Fixed64,
    /// Remaining time in the current timed state (in state-local units).
    timer: Fixed64,
    miss_fired: bool,
}

impl Customer {
    pub fn new(tray: TrayId, dock_slot: DockSlotId, patience_max: Fixed64, timings: &CustomerTimings) -> Self {
        Self {
            tray: Some(tray),
            dock_slot: Some(dock_slot),
            state: CustomerState::Arriving,
            patience_max,
            patience: patience_max,
            timer: timings.arrive,
            miss_fired: false,
        }
    }

    pub fn state(&self) -> CustomerState {
        self.state
    }

    pub fn patience(&self) -> Fixed64 {
        self.patience
    }

    pub fn patience_max(&self) -> Fixed64 {
        self.patience_max
    }

    /// Remaining patience as a fraction of the starting value.
    pub fn patience_fraction(&self) -> Fixed64 {
        if self.patience_max <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        (self.patience / self.patience_max).clamp(Fixed64::ZERO, Fixed64::ONE)
    }

    pub fn is_gone(&self) -> bool {
        self.state == CustomerState::Gone
    }

    /// Advance by `dt` seconds.
    ///
    /// `order_completed` tells the machine whether its tray is already
    /// done; a completed order never expires.
    pub fn advance(
        &mut self,
        dt: Fixed64,
        ambient_speed: Fixed64,
        timings: &CustomerTimings,
        order_completed: bool,
    ) -> CustomerTick {
        let mut tick = CustomerTick::default();
        let mut remaining = dt.max(Fixed64::ZERO);

        loop {
            match self.state {
                CustomerState::Gone => break,
                CustomerState::AtWindow => {
                    self.patience = (self.patience - remaining).max(Fixed64::ZERO);
                    if self.patience == Fixed64::ZERO && !order_completed && !self.miss_fired {
                        self.miss_fired = true;
                        tick.patience_expired = true;
                    }
                    break;
                }
                state => {
                    let rate = if matches!(state, CustomerState::Arriving | CustomerState::Departing) {
                        ambient_speed.max(f64_to_fixed64(0.01))
                    } else {
                        Fixed64::ONE
                    };
                    let needed = self.timer / rate;
                    if remaining < needed {
                        self.timer -= remaining * rate;
                        break;
                    }
                    remaining -= needed;
                    let next = Self::next_state(state);
                    self.enter(next, timings, &mut tick);
                }
            }
        }

        tick
    }

    /// Leave the window (or abort the approach). Used by resolution and
    /// teardown; a customer already on the way out is unaffected.
    pub fn depart(&mut self, timings: &CustomerTimings) -> Option<Transition> {
        let next = match self.state {
            CustomerState::EvaToWindow | CustomerState::AtWindow => CustomerState::EvaToShip,
            CustomerState::Arriving | CustomerState::Parked => CustomerState::Departing,
            CustomerState::EvaToShip | CustomerState::Departing | CustomerState::Gone => return None,
        };
        let mut tick = CustomerTick::default();
        self.enter(next, timings, &mut tick);
        tick.transitions.pop()
    }

    fn enter(&mut self, next: CustomerState, timings: &CustomerTimings, tick: &mut CustomerTick) {
        tick.transitions.push(Transition {
            from: self.state,
            to: next,
        });
        self.state = next;
        self.timer = timings.duration(next);
    }

    fn next_state(state: CustomerState) -> CustomerState {
        match state {
            CustomerState::Arriving => CustomerState::Parked,
            CustomerState::Parked => CustomerState::EvaToWindow,
            CustomerState::EvaToWindow => CustomerState::AtWindow,
            CustomerState::AtWindow => CustomerState::AtWindow,
            CustomerState::EvaToShip => CustomerState::Departing,
            CustomerState::Departing | CustomerState::Gone => CustomerState::Gone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn secs(v: f64) -> Fixed64 {
        f64_to_fixed64(v)
    }

    fn customer(patience: f64) -> Customer {
        let mut sm = SlotMap::<TrayId, ()>::with_key();
        Customer::new(sm.insert(()), DockSlotId(0), secs(patience), &CustomerTimings::default())
    }

    /// Default approach takes 3 + 0.5 + 2 = 5.5 seconds at speed 1.
    fn walk_to_window(c: &mut Customer) -> CustomerTick {
        c.advance(secs(5.5), Fixed64::ONE, &CustomerTimings::default(), false)
    }

    #[test]
    fn approach_runs_through_every_state() {
        let mut c = customer(30.0);
        let tick = walk_to_window(&mut c);
        let path: Vec<_> = tick.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            path,
            vec![
                CustomerState::Parked,
                CustomerState::EvaToWindow,
                CustomerState::AtWindow
            ]
        );
        assert_eq!(c.state(), CustomerState::AtWindow);
    }

    #[test]
    fn patience_frozen_until_at_window() {
        let mut c = customer(30.0);
        c.advance(secs(5.0), Fixed64::ONE, &CustomerTimings::default(), false);
        assert_eq!(c.state(), CustomerState::EvaToWindow);
        assert_eq!(c.patience(), secs(30.0));
    }

    #[test]
    fn leftover_time_decays_patience_in_same_tick() {
        let mut c = customer(30.0);
        c.advance(secs(7.5), Fixed64::ONE, &CustomerTimings::default(), false);
        assert_eq!(c.state(), CustomerState::AtWindow);
        assert_eq!(c.patience(), secs(28.0));
    }

    #[test]
    fn sliced_and_whole_deltas_agree() {
        let timings = CustomerTimings::default();
        let mut whole = customer(30.0);
        whole.advance(secs(9.0), Fixed64::ONE, &timings, false);

        let mut sliced = customer(30.0);
        for _ in 0..36 {
            sliced.advance(secs(0.25), Fixed64::ONE, &timings, false);
        }
        assert_eq!(whole.state(), sliced.state());
        assert_eq!(whole.patience(), sliced.patience());
    }

    #[test]
    fn ambient_speed_shortens_transit() {
        let mut slow = customer(30.0);
        let mut fast = customer(30.0);
        let timings = CustomerTimings::default();
        slow.advance(secs(1.6), Fixed64::ONE, &timings, false);
        fast.advance(secs(1.6), secs(2.0), &timings, false);
        assert_eq!(slow.state(), CustomerState::Arriving);
        assert_eq!(fast.state(), CustomerState::Parked);
    }

    #[test]
    fn expiry_fires_exactly_once_and_never_below_zero() {
        let mut c = customer(2.0);
        walk_to_window(&mut c);
        let timings = CustomerTimings::default();

        let first = c.advance(secs(3.0), Fixed64::ONE, &timings, false);
        assert!(first.patience_expired);
        assert_eq!(c.patience(), Fixed64::ZERO);

        for _ in 0..5 {
            let again = c.advance(secs(1.0), Fixed64::ONE, &timings, false);
            assert!(!again.patience_expired);
            assert_eq!(c.patience(), Fixed64::ZERO);
        }
    }

    #[test]
    fn completed_order_does_not_expire() {
        let mut c = customer(1.0);
        walk_to_window(&mut c);
        let tick = c.advance(secs(5.0), Fixed64::ONE, &CustomerTimings::default(), true);
        assert!(!tick.patience_expired);
        assert_eq!(c.patience(), Fixed64::ZERO);
    }

    #[test]
    fn customer_waits_at_window_until_departed() {
        let mut c = customer(100.0);
        walk_to_window(&mut c);
        let timings = CustomerTimings::default();
        c.advance(secs(50.0), Fixed64::ONE, &timings, false);
        assert_eq!(c.state(), CustomerState::AtWindow);

        let t = c.depart(&timings).unwrap();
        assert_eq!(t.from, CustomerState::AtWindow);
        assert_eq!(t.to, CustomerState::EvaToShip);

        // Patience is frozen on the way back.
        let before = c.patience();
        let tick = c.advance(secs(10.0), Fixed64::ONE, &timings, false);
        assert_eq!(c.patience(), before);
        assert!(c.is_gone());
        assert_eq!(tick.transitions.last().unwrap().to, CustomerState::Gone);
    }

    #[test]
    fn depart_while_arriving_skips_the_walk() {
        let mut c = customer(30.0);
        let t = c.depart(&CustomerTimings::default()).unwrap();
        assert_eq!(t.to, CustomerState::Departing);
        assert!(c.depart(&CustomerTimings::default()).is_none());
    }

    #[test]
    fn patience_rules_decay_to_floor() {
        let rules = PatienceRules::default();
        assert_eq!(rules.patience_for(Fixed64::ZERO), secs(60.0));
        assert_eq!(rules.patience_for(secs(120.0)), secs(50.0));
        assert_eq!(rules.patience_for(secs(3600.0)), secs(25.0));
    }

    #[test]
    fn patience_fraction_tracks_remaining() {
        let mut c = customer(20.0);
        walk_to_window(&mut c);
        c.advance(secs(5.0), Fixed64::ONE, &CustomerTimings::default(), false);
        assert_eq!(c.patience_fraction(), secs(0.75));
    }
}
