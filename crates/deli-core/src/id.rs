use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a tray (an order being assembled) in the shift arena.
    pub struct TrayId;

    /// Identifies a customer (ship and avatar) in the shift arena.
    pub struct CustomerId;
}

/// Identifies an ingredient in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IngredientId(pub u32);

/// Identifies a treatment (toasting, pressing, ...) in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TreatmentId(pub u32);

/// Index of a customer parking position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DockSlotId(pub u16);

/// Index of a build workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrepSlotId(pub u16);

/// Anything the player can pick up: an ingredient from a bin or a
/// treatment tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pickup {
    Ingredient(IngredientId),
    Treatment(TreatmentId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_id_equality() {
        assert_eq!(IngredientId(0), IngredientId(0));
        assert_ne!(IngredientId(0), IngredientId(1));
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(IngredientId(0), "bread_white");
        map.insert(IngredientId(1), "meat_ham");
        assert_eq!(map[&IngredientId(1)], "meat_ham");
    }

    #[test]
    fn slot_ids_order_by_index() {
        assert!(DockSlotId(0) < DockSlotId(3));
        assert!(PrepSlotId(1) > PrepSlotId(0));
    }
}
