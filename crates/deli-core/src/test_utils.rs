//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so integration
//! tests and benches reach them through the `test-utils` feature.

use std::collections::BTreeMap;

use crate::catalog::{Catalog, CatalogBuilder, Category};
use crate::config::ShiftConfig;
use crate::customer::CustomerTimings;
use crate::engine::Shift;
use crate::fixed::Fixed64;
use crate::id::{IngredientId, Pickup, TrayId, TreatmentId};
use crate::inventory::Inventory;
use crate::persistence::{MemoryStore, SaveDocument};
use crate::scoring::{ScoringRules, TipPolicy};
use crate::sim::{AdvanceResult, SimulationStrategy};
use crate::tray::{TrayState, Verdict};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Two breads, two meats, two cheeses, four toppings, two sauces and two
/// treatments.
pub fn standard_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    b.register_ingredient("bread_white", Category::Bread, 50);
    b.register_ingredient("bread_wheat", Category::Bread, 60);
    b.register_ingredient("meat_ham", Category::Meat, 150);
    b.register_ingredient("meat_turkey", Category::Meat, 175);
    b.register_ingredient("cheese_swiss", Category::Cheese, 75);
    b.register_ingredient("cheese_cheddar", Category::Cheese, 70);
    b.register_ingredient("topping_lettuce", Category::Topping, 20);
    b.register_ingredient("topping_tomato", Category::Topping, 25);
    b.register_ingredient("topping_onion", Category::Topping, 15);
    b.register_ingredient("topping_pickle", Category::Topping, 15);
    b.register_ingredient("sauce_mayo", Category::Sauce, 10);
    b.register_ingredient("sauce_mustard", Category::Sauce, 10);
    b.register_treatment("toast");
    b.register_treatment("press");
    b.build().expect("standard catalog is complete")
}

pub fn bread_white(catalog: &Catalog) -> IngredientId {
    catalog.ingredient_id("bread_white").unwrap()
}

pub fn meat_ham(catalog: &Catalog) -> IngredientId {
    catalog.ingredient_id("meat_ham").unwrap()
}

pub fn cheese_swiss(catalog: &Catalog) -> IngredientId {
    catalog.ingredient_id("cheese_swiss").unwrap()
}

pub fn toast(catalog: &Catalog) -> TreatmentId {
    catalog.treatment_id("toast").unwrap()
}

// ===========================================================================
// Stock
// ===========================================================================

/// Inventory holding exactly the named counts.
pub fn stocked(catalog: &Catalog, counts: &[(&str, u32)]) -> Inventory {
    Inventory::from_named(catalog, &named(counts))
}

/// `n` of every ingredient in the catalog.
pub fn full_stock(catalog: &Catalog, n: u32) -> Inventory {
    let mut inv = Inventory::new(catalog);
    for id in catalog.ingredient_ids() {
        inv.restock(id, n);
    }
    inv
}

pub fn named(counts: &[(&str, u32)]) -> BTreeMap<String, u32> {
    counts.iter().map(|&(name, n)| (name.to_string(), n)).collect()
}

/// A fresh save document holding the named counts.
pub fn stocked_save(counts: &[(&str, u32)]) -> SaveDocument {
    SaveDocument::with_stock(named(counts))
}

/// A fresh save with `n` of every ingredient in [`standard_catalog`].
pub fn full_save(n: u32) -> SaveDocument {
    let catalog = standard_catalog();
    SaveDocument::with_stock(full_stock(&catalog, n).to_named(&catalog))
}

// ===========================================================================
// Shifts
// ===========================================================================

/// Deterministic tuning for tests: quarter-second fixed steps, short
/// customer walks, flat tips.
pub fn test_config() -> ShiftConfig {
    ShiftConfig {
        timings: CustomerTimings {
            arrive: fixed(0.5),
            park: fixed(0.25),
            eva_to_window: fixed(0.25),
            eva_to_ship: fixed(0.5),
            depart: fixed(0.5),
        },
        tray_spawn_secs: fixed(0.25),
        scoring: ScoringRules {
            tip: TipPolicy::flat(),
            ..ScoringRules::default()
        },
        strategy: SimulationStrategy::Fixed {
            timestep: fixed(0.25),
        },
        ..ShiftConfig::default()
    }
}

/// An idle shift over an in-memory store seeded with `save`.
pub fn shift_from_save(config: ShiftConfig, save: SaveDocument) -> (Shift, MemoryStore) {
    let store = MemoryStore::with_document(save);
    let shift = Shift::new(config, standard_catalog(), Box::new(store.clone()), SaveDocument::default());
    (shift, store)
}

/// An idle shift holding exactly the named stock.
pub fn shift_with_stock(counts: &[(&str, u32)]) -> Shift {
    shift_from_save(test_config(), stocked_save(counts)).0
}

/// An idle shift with plenty of everything.
pub fn basic_shift() -> Shift {
    shift_from_save(test_config(), full_save(50)).0
}

/// [`basic_shift`], already open.
pub fn open_shift() -> Shift {
    let mut shift = basic_shift();
    assert!(shift.open_store());
    shift
}

// ===========================================================================
// Driving a shift
// ===========================================================================

pub fn advance_secs(shift: &mut Shift, secs: f64) -> AdvanceResult {
    shift.advance(fixed(secs))
}

/// The in-flight tray with the lowest order number.
pub fn oldest_tray(shift: &Shift) -> Option<TrayId> {
    shift
        .tray_ids()
        .into_iter()
        .min_by_key(|&id| shift.tray(id).map(|t| t.order_num))
}

/// Step until at least one tray exists and return the oldest.
pub fn spawn_first(shift: &mut Shift) -> TrayId {
    for _ in 0..1_000 {
        if let Some(id) = oldest_tray(shift) {
            return id;
        }
        shift.step();
    }
    panic!("no tray spawned");
}

/// Step until the oldest tray is taking ingredients.
pub fn walk_customer_in(shift: &mut Shift) {
    for _ in 0..1_000 {
        if let Some(id) = oldest_tray(shift)
            && shift.tray(id).is_some_and(|t| t.state() == TrayState::Active)
        {
            return;
        }
        shift.step();
    }
    panic!("customer never reached the window");
}

/// Place every remaining ingredient and apply every remaining treatment.
pub fn build_order(shift: &mut Shift, tray: TrayId) {
    loop {
        let next = shift.tray(tray).and_then(|t| t.expected_next());
        let Some(key) = next else { break };
        assert_eq!(shift.pick_up(Pickup::Ingredient(key)), Verdict::Valid);
        assert_eq!(shift.place(Some(tray)), Verdict::Valid);
    }
    let pending: Vec<TreatmentId> = shift
        .tray(tray)
        .map(|t| t.pending_treatments().collect())
        .unwrap_or_default();
    for key in pending {
        assert_eq!(shift.pick_up(Pickup::Treatment(key)), Verdict::Valid);
        assert_eq!(shift.place(Some(tray)), Verdict::Valid);
    }
    assert!(shift.tray(tray).is_some_and(|t| t.is_completed()));
}

/// Build and hand over the oldest tray.
pub fn serve_oldest(shift: &mut Shift) -> Option<TrayId> {
    let tray = oldest_tray(shift)?;
    if shift.tray(tray)?.state() != TrayState::Active {
        return None;
    }
    build_order(shift, tray);
    shift.deliver(tray).ok()?;
    Some(tray)
}
