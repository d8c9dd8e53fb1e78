//! Per-ingredient stock counters.
//!
//! The store is pure counter storage. It knows each key's category so that
//! order generation can ask "which meats are in stock" without touching the
//! catalog, and it converts to and from the name-keyed map that the save
//! document carries.

use crate::catalog::{Catalog, Category};
use crate::id::IngredientId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    counts: Vec<u32>,
    categories: Vec<Category>,
}

impl Inventory {
    /// An empty store with one counter per catalog ingredient.
    pub fn new(catalog: &Catalog) -> Self {
        let categories = catalog
            .ingredient_ids()
            .filter_map(|id| catalog.category(id))
            .collect::<Vec<_>>();
        Self {
            counts: vec![0; categories.len()],
            categories,
        }
    }

    /// Rebuild a store from a name-keyed stock map. Names the catalog does
    /// not know are dropped.
    pub fn from_named(catalog: &Catalog, stock: &BTreeMap<String, u32>) -> Self {
        let mut inventory = Self::new(catalog);
        for (name, &count) in stock {
            match catalog.ingredient_id(name) {
                Some(id) => inventory.restock(id, count),
                None => tracing::warn!(ingredient = %name, "dropping stock for unknown ingredient"),
            }
        }
        inventory
    }

    /// Name-keyed snapshot of every counter, including empty ones.
    pub fn to_named(&self, catalog: &Catalog) -> BTreeMap<String, u32> {
        catalog
            .ingredient_ids()
            .map(|id| (catalog.ingredient_name(id).to_string(), self.count(id)))
            .collect()
    }

    pub fn count(&self, key: IngredientId) -> u32 {
        self.counts.get(key.0 as usize).copied().unwrap_or(0)
    }

    pub fn has_stock(&self, key: IngredientId) -> bool {
        self.count(key) > 0
    }

    /// Take one unit. Returns false, without mutating, when the count is 0
    /// or the key is unknown.
    pub fn consume(&mut self, key: IngredientId) -> bool {
        match self.counts.get_mut(key.0 as usize) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Add `n` units. Unknown keys are ignored.
    pub fn restock(&mut self, key: IngredientId, n: u32) {
        if let Some(count) = self.counts.get_mut(key.0 as usize) {
            *count = count.saturating_add(n);
        }
    }

    /// Keys of `category` with a count above zero, in catalog order.
    pub fn category_stock(&self, category: Category) -> Vec<IngredientId> {
        self.keys_with_at_least(category, 1)
    }

    /// Keys of `category` with at least `n` units, in catalog order.
    pub fn keys_with_at_least(&self, category: Category, n: u32) -> Vec<IngredientId> {
        self.categories
            .iter()
            .zip(&self.counts)
            .enumerate()
            .filter(|(_, (c, count))| **c == category && **count >= n.max(1))
            .map(|(idx, _)| IngredientId(idx as u32))
            .collect()
    }

    /// Total units across all keys.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}
