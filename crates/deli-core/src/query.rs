//! Read-only snapshots for render, HUD and audio adapters.
//!
//! All types are owned copies keyed by arena ids; nothing here borrows
//! shift storage.

use crate::customer::CustomerState;
use crate::dock::DockPosition;
use crate::fixed::{Cents, Fixed64, Ticks};
use crate::id::{CustomerId, DockSlotId, IngredientId, PrepSlotId, TrayId, TreatmentId};
use crate::tray::TrayState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraySnapshot {
    pub id: TrayId,
    pub order_num: u32,
    pub state: TrayState,
    pub ingredients: Vec<IngredientId>,
    pub placed: Vec<IngredientId>,
    pub treatments: Vec<TreatmentId>,
    pub applied_treatments: Vec<TreatmentId>,
    pub total_price: Cents,
    pub dock_slot: DockSlotId,
    pub prep_slot: PrepSlotId,
    pub customer: CustomerId,
    pub spawned_at: Ticks,
}

impl TraySnapshot {
    /// The ingredient the ticket asks for next.
    pub fn next_ingredient(&self) -> Option<IngredientId> {
        self.ingredients.get(self.placed.len()).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSnapshot {
    pub id: CustomerId,
    pub state: CustomerState,
    pub tray: Option<TrayId>,
    pub patience: Fixed64,
    pub patience_max: Fixed64,
    /// 0..1, for the patience bar.
    pub patience_fraction: Fixed64,
    pub dock_slot: Option<DockSlotId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DockSnapshot {
    pub id: DockSlotId,
    pub position: DockPosition,
    pub occupied_by: Option<TrayId>,
}
