//! Deli Core -- the order fulfillment pipeline for a sandwich-service
//! arcade game.
//!
//! Customers dock their ships, walk to the window and wait while the player
//! stacks their sandwich ingredient by ingredient. This crate owns
//! everything between "a ship appears" and "the order is paid or missed":
//! order generation, the tray and customer state machines, dock and prep
//! slot pools, scoring with its miss limit, and the save document.
//!
//! # Step Pipeline
//!
//! Each step of [`engine::Shift`] runs through these phases:
//!
//! 1. **Pre-tick** -- Execute commands from reactive handlers and the queue.
//! 2. **Customers** -- Ships fly in, customers walk, patience drains.
//! 3. **Trays** -- Spawn-in timers finish; trays go live once the customer
//!    is at the window.
//! 4. **Resolution** -- Orders whose customers ran out of patience are missed.
//! 5. **Spawn** -- The scheduler may generate a new order.
//! 6. **Shift clock** -- Timed shifts close; a drained store pays out.
//! 7. **Post-tick** -- Deliver buffered events and flush the save.
//! 8. **Bookkeeping** -- Increment the tick counter and compute the state hash.
//!
//! # Key Types
//!
//! - [`engine::Shift`] -- Owns every component and the step pipeline.
//! - [`order::OrderGenerator`] -- Builds bookended tickets from current stock.
//! - [`tray::Tray`] -- Prefix-ordered assembly of one order.
//! - [`customer::Customer`] -- Ship and avatar state machine with patience.
//! - [`dock::DockAllocator`] / [`prep::PrepAllocator`] -- Fixed slot pools.
//! - [`scoring::ScoreState`] -- Money, points, combo and termination.
//! - [`event::EventBus`] -- Typed events with buffered delivery.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic timing.

pub mod catalog;
pub mod command_queue;
pub mod config;
pub mod customer;
pub mod difficulty;
pub mod dock;
pub mod engine;
pub mod error;
pub mod event;
pub mod fixed;
pub mod id;
pub mod inventory;
pub mod order;
pub mod persistence;
pub mod pool;
pub mod prep;
pub mod query;
pub mod rng;
pub mod scoring;
pub mod sim;
pub mod spawn;
pub mod tray;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use catalog::{Catalog, CatalogBuilder, Category};
pub use config::ShiftConfig;
pub use engine::{Shift, ShiftPhase};
pub use error::ShiftError;
pub use event::{Event, EventKind};
pub use fixed::{Cents, Fixed64, Ticks};
pub use id::{CustomerId, DockSlotId, IngredientId, Pickup, PrepSlotId, TrayId, TreatmentId};
pub use persistence::{MemoryStore, SaveDocument, SaveStore, StoreError};
pub use tray::{TrayState, Verdict};
