//! Shift statistics for the deli engine.
//!
//! Consumes the event stream (`TraySpawned`, `IngredientPlaced`,
//! `IngredientWrong`, `TreatmentApplied`, `TrayDelivered`, `TrayMissed`,
//! `ShiftTerminated`, `ShiftClosed`) and aggregates it into counters and a
//! rolling window of service times using [`Fixed64`] arithmetic.
//!
//! # Usage
//!
//! ```ignore
//! let stats = ShiftStats::attach(&mut shift, StatsConfig::default());
//! shift.advance(dt);
//! let avg = stats.borrow().average_service_ticks();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use deli_core::engine::Shift;
use deli_core::event::{Event, EventKind};
use deli_core::fixed::{Cents, Fixed64, Ticks};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// How many recent service times the rolling average covers.
    pub service_history: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { service_history: 32 }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer of [`Fixed64`] samples.
///
/// When full, the oldest entry is overwritten. Iterates oldest-to-newest.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<Fixed64>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Capacity is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![Fixed64::ZERO; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, value: Fixed64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn latest(&self) -> Option<Fixed64> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        Some(self.data[idx])
    }

    /// Iterate values from oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Fixed64> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).map(move |i| self.data[(start + i) % self.capacity()])
    }

    pub fn to_vec(&self) -> Vec<Fixed64> {
        self.iter().collect()
    }

    /// Mean of the stored samples.
    pub fn mean(&self) -> Option<Fixed64> {
        if self.len == 0 {
            return None;
        }
        let sum = self.iter().fold(Fixed64::ZERO, |acc, v| acc.saturating_add(v));
        Some(sum / Fixed64::from_num(self.len))
    }

    pub fn max(&self) -> Option<Fixed64> {
        self.iter().max()
    }

    pub fn clear(&mut self) {
        self.data.fill(Fixed64::ZERO);
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// ShiftStats
// ---------------------------------------------------------------------------

/// Aggregated counters for one or more shifts.
#[derive(Debug, Clone)]
pub struct ShiftStats {
    pub spawned: u32,
    pub delivered: u32,
    pub missed: u32,
    /// Ingredients placed on the right layer.
    pub placements: u32,
    /// Wrong placements on a tray (score penalty applied).
    pub wrong_placements: u32,
    /// Pick-ups refused for missing stock or unknown keys.
    pub rejected_pickups: u32,
    pub treatments_applied: u32,
    pub best_combo: u32,
    pub money_earned: Cents,
    pub points_earned: u64,
    pub terminations: u32,
    pub shifts_closed: u32,
    service_ticks: RingBuffer,
    last_tick: Ticks,
}

impl ShiftStats {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            spawned: 0,
            delivered: 0,
            missed: 0,
            placements: 0,
            wrong_placements: 0,
            rejected_pickups: 0,
            treatments_applied: 0,
            best_combo: 0,
            money_earned: 0,
            points_earned: 0,
            terminations: 0,
            shifts_closed: 0,
            service_ticks: RingBuffer::new(config.service_history),
            last_tick: 0,
        }
    }

    /// Subscribe a shared instance to every event kind on `shift`.
    pub fn attach(shift: &mut Shift, config: StatsConfig) -> Rc<RefCell<Self>> {
        let stats = Rc::new(RefCell::new(Self::new(config)));
        for kind in EventKind::ALL {
            let s = stats.clone();
            shift.on_passive(kind, Box::new(move |event| s.borrow_mut().process_event(event)));
        }
        stats
    }

    pub fn process_event(&mut self, event: &Event) {
        self.last_tick = self.last_tick.max(event.tick());
        match event {
            Event::TraySpawned { .. } => self.spawned += 1,
            Event::IngredientPlaced { .. } => self.placements += 1,
            Event::IngredientWrong { tray: Some(_), .. } => self.wrong_placements += 1,
            Event::IngredientWrong { tray: None, .. } => self.rejected_pickups += 1,
            Event::TreatmentApplied { .. } => self.treatments_applied += 1,
            Event::TrayDelivered {
                money,
                points,
                combo,
                spawned_at,
                tick,
                ..
            } => {
                self.delivered += 1;
                self.money_earned = self.money_earned.saturating_add(*money);
                self.points_earned = self.points_earned.saturating_add(*points);
                self.best_combo = self.best_combo.max(*combo);
                let ticks = tick.saturating_sub(*spawned_at);
                self.service_ticks.push(Fixed64::saturating_from_num(ticks));
            }
            Event::TrayMissed { .. } => self.missed += 1,
            Event::ShiftTerminated { .. } => self.terminations += 1,
            Event::ShiftClosed { .. } => self.shifts_closed += 1,
            Event::TrayCompleted { .. } | Event::CustomerStateChanged { .. } => {}
        }
    }

    /// Valid placements over all placements on a tray. `None` before the
    /// first placement.
    pub fn accuracy(&self) -> Option<Fixed64> {
        let valid = self.placements + self.treatments_applied;
        let total = valid + self.wrong_placements;
        if total == 0 {
            return None;
        }
        Some(Fixed64::from_num(valid) / Fixed64::from_num(total))
    }

    /// Delivered over resolved orders.
    pub fn completion_rate(&self) -> Option<Fixed64> {
        let resolved = self.delivered + self.missed;
        if resolved == 0 {
            return None;
        }
        Some(Fixed64::from_num(self.delivered) / Fixed64::from_num(resolved))
    }

    /// Orders spawned but not yet delivered or missed.
    pub fn in_flight(&self) -> u32 {
        self.spawned.saturating_sub(self.delivered + self.missed)
    }

    /// Rolling mean of spawn-to-delivery time, in ticks.
    pub fn average_service_ticks(&self) -> Option<Fixed64> {
        self.service_ticks.mean()
    }

    pub fn slowest_service_ticks(&self) -> Option<Fixed64> {
        self.service_ticks.max()
    }

    pub fn service_history(&self) -> &RingBuffer {
        &self.service_ticks
    }

    /// Latest tick seen on any event.
    pub fn last_tick(&self) -> Ticks {
        self.last_tick
    }

    pub fn reset(&mut self) {
        let capacity = self.service_ticks.capacity();
        *self = Self::new(StatsConfig {
            service_history: capacity,
        });
    }
}

impl Default for ShiftStats {
    fn default() -> Self {
        Self::new(StatsConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use deli_core::id::{IngredientId, Pickup, TrayId};
    use slotmap::SlotMap;

    fn make_tray_id() -> TrayId {
        let mut sm = SlotMap::<TrayId, ()>::with_key();
        sm.insert(())
    }

    fn delivered(spawned_at: Ticks, tick: Ticks, combo: u32) -> Event {
        Event::TrayDelivered {
            tray: make_tray_id(),
            order_num: 1,
            money: 450,
            points: 45,
            combo,
            spawned_at,
            tick,
        }
    }

    fn fx(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    // -----------------------------------------------------------------------
    // RingBuffer
    // -----------------------------------------------------------------------

    #[test]
    fn ring_buffer_overwrites_oldest() {
        let mut rb = RingBuffer::new(3);
        for v in [1, 2, 3, 4] {
            rb.push(Fixed64::from_num(v));
        }
        assert_eq!(rb.len(), 3);
        assert_eq!(rb.to_vec(), vec![fx(2.0), fx(3.0), fx(4.0)]);
        assert_eq!(rb.latest(), Some(fx(4.0)));
        assert_eq!(rb.mean(), Some(fx(3.0)));
        assert_eq!(rb.max(), Some(fx(4.0)));
    }

    #[test]
    fn ring_buffer_zero_capacity_holds_one() {
        let mut rb = RingBuffer::new(0);
        rb.push(fx(1.0));
        rb.push(fx(2.0));
        assert_eq!(rb.capacity(), 1);
        assert_eq!(rb.to_vec(), vec![fx(2.0)]);
    }

    #[test]
    fn ring_buffer_clear() {
        let mut rb = RingBuffer::new(4);
        rb.push(fx(5.0));
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.latest(), None);
        assert_eq!(rb.mean(), None);
    }

    // -----------------------------------------------------------------------
    // ShiftStats
    // -----------------------------------------------------------------------

    #[test]
    fn delivery_updates_money_combo_and_service_time() {
        let mut stats = ShiftStats::default();
        stats.process_event(&delivered(10, 70, 1));
        stats.process_event(&delivered(20, 140, 2));

        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.money_earned, 900);
        assert_eq!(stats.points_earned, 90);
        assert_eq!(stats.best_combo, 2);
        assert_eq!(stats.average_service_ticks(), Some(fx(90.0)));
        assert_eq!(stats.slowest_service_ticks(), Some(fx(120.0)));
        assert_eq!(stats.last_tick(), 140);
    }

    #[test]
    fn accuracy_ignores_refused_pickups() {
        let mut stats = ShiftStats::default();
        assert_eq!(stats.accuracy(), None);
        let tray = make_tray_id();
        for _ in 0..3 {
            stats.process_event(&Event::IngredientPlaced {
                tray,
                ingredient: IngredientId(0),
                tick: 1,
            });
        }
        stats.process_event(&Event::IngredientWrong {
            tray: Some(tray),
            item: Pickup::Ingredient(IngredientId(2)),
            tick: 2,
        });
        stats.process_event(&Event::IngredientWrong {
            tray: None,
            item: Pickup::Ingredient(IngredientId(5)),
            tick: 3,
        });

        assert_eq!(stats.accuracy(), Some(fx(0.75)));
        assert_eq!(stats.rejected_pickups, 1);
    }

    #[test]
    fn completion_rate_and_in_flight() {
        let mut stats = ShiftStats::default();
        let spawn = |order_num| Event::TraySpawned {
            tray: make_tray_id(),
            customer: slotmap::SlotMap::<deli_core::CustomerId, ()>::with_key().insert(()),
            order_num,
            dock_slot: deli_core::DockSlotId(0),
            prep_slot: deli_core::PrepSlotId(0),
            tick: 0,
        };
        for n in 1..=4 {
            stats.process_event(&spawn(n));
        }
        stats.process_event(&delivered(0, 30, 1));
        stats.process_event(&Event::TrayMissed {
            tray: make_tray_id(),
            order_num: 2,
            missed_count: 1,
            spawned_at: 0,
            tick: 40,
        });

        assert_eq!(stats.completion_rate(), Some(fx(0.5)));
        assert_eq!(stats.in_flight(), 2);
    }

    #[test]
    fn reset_keeps_window_size() {
        let mut stats = ShiftStats::new(StatsConfig { service_history: 5 });
        stats.process_event(&delivered(0, 10, 1));
        stats.reset();
        assert_eq!(stats.delivered, 0);
        assert!(stats.service_history().is_empty());
        assert_eq!(stats.service_history().capacity(), 5);
    }

    #[test]
    fn attached_stats_follow_a_real_shift() {
        use deli_core::test_utils::*;

        let mut shift = open_shift();
        let stats = ShiftStats::attach(&mut shift, StatsConfig::default());
        let tray = spawn_first(&mut shift);
        walk_customer_in(&mut shift);
        build_order(&mut shift, tray);
        shift.deliver(tray).unwrap();
        shift.step();

        let stats = stats.borrow();
        assert!(stats.spawned >= 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.wrong_placements, 0);
        assert_eq!(stats.accuracy(), Some(Fixed64::ONE));
        assert!(stats.average_service_ticks().unwrap() > Fixed64::ZERO);
    }
}
