use crate::fixed::Cents;
use crate::id::{IngredientId, TreatmentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which bin an ingredient lives in. Order generation draws one slot of the
/// sandwich from each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Bread,
    Meat,
    Cheese,
    Topping,
    Sauce,
}

/// An ingredient definition in the catalog.
#[derive(Debug, Clone)]
pub struct IngredientDef {
    pub name: String,
    pub category: Category,
    /// Price of one unit on a ticket, and per unit when purchased.
    pub price: Cents,
}

/// A treatment definition in the catalog.
#[derive(Debug, Clone)]
pub struct TreatmentDef {
    pub name: String,
}

/// Builder for constructing an immutable [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    ingredients: Vec<IngredientDef>,
    ingredient_name_to_id: HashMap<String, IngredientId>,
    treatments: Vec<TreatmentDef>,
    treatment_name_to_id: HashMap<String, TreatmentId>,
    duplicates: Vec<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ingredient. Returns its ID.
    pub fn register_ingredient(&mut self, name: &str, category: Category, price: Cents) -> IngredientId {
        if let Some(&existing) = self.ingredient_name_to_id.get(name) {
            self.duplicates.push(name.to_string());
            return existing;
        }
        let id = IngredientId(self.ingredients.len() as u32);
        self.ingredients.push(IngredientDef {
            name: name.to_string(),
            category,
            price,
        });
        self.ingredient_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a treatment. Returns its ID.
    pub fn register_treatment(&mut self, name: &str) -> TreatmentId {
        if let Some(&existing) = self.treatment_name_to_id.get(name) {
            self.duplicates.push(name.to_string());
            return existing;
        }
        let id = TreatmentId(self.treatments.len() as u32);
        self.treatments.push(TreatmentDef {
            name: name.to_string(),
        });
        self.treatment_name_to_id.insert(name.to_string(), id);
        id
    }

    pub fn ingredient_id(&self, name: &str) -> Option<IngredientId> {
        self.ingredient_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable catalog.
    ///
    /// A catalog must carry at least one bread and one meat, otherwise no
    /// ticket could ever be generated.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(CatalogError::DuplicateName(name));
        }
        for required in [Category::Bread, Category::Meat] {
            if !self.ingredients.iter().any(|i| i.category == required) {
                return Err(CatalogError::MissingCategory(required));
            }
        }
        Ok(Catalog {
            ingredients: self.ingredients,
            ingredient_name_to_id: self.ingredient_name_to_id,
            treatments: self.treatments,
            treatment_name_to_id: self.treatment_name_to_id,
        })
    }
}

/// Immutable ingredient and treatment catalog. Frozen after build().
#[derive(Debug, Clone)]
pub struct Catalog {
    ingredients: Vec<IngredientDef>,
    ingredient_name_to_id: HashMap<String, IngredientId>,
    treatments: Vec<TreatmentDef>,
    treatment_name_to_id: HashMap<String, TreatmentId>,
}

impl Catalog {
    pub fn ingredient(&self, id: IngredientId) -> Option<&IngredientDef> {
        self.ingredients.get(id.0 as usize)
    }

    pub fn treatment(&self, id: TreatmentId) -> Option<&TreatmentDef> {
        self.treatments.get(id.0 as usize)
    }

    pub fn ingredient_id(&self, name: &str) -> Option<IngredientId> {
        self.ingredient_name_to_id.get(name).copied()
    }

    pub fn treatment_id(&self, name: &str) -> Option<TreatmentId> {
        self.treatment_name_to_id.get(name).copied()
    }

    pub fn category(&self, id: IngredientId) -> Option<Category> {
        self.ingredient(id).map(|i| i.category)
    }

    /// Unit price of an ingredient; unknown ids are free.
    pub fn price(&self, id: IngredientId) -> Cents {
        self.ingredient(id).map(|i| i.price).unwrap_or(0)
    }

    pub fn ingredient_name(&self, id: IngredientId) -> &str {
        self.ingredient(id).map(|i| i.name.as_str()).unwrap_or("?")
    }

    pub fn treatment_name(&self, id: TreatmentId) -> &str {
        self.treatment(id).map(|t| t.name.as_str()).unwrap_or("?")
    }

    /// All ingredient ids in registration order.
    pub fn ingredient_ids(&self) -> impl Iterator<Item = IngredientId> + '_ {
        (0..self.ingredients.len() as u32).map(IngredientId)
    }

    /// All treatment ids in registration order.
    pub fn treatment_ids(&self) -> impl Iterator<Item = TreatmentId> + '_ {
        (0..self.treatments.len() as u32).map(TreatmentId)
    }

    pub fn ingredient_count(&self) -> usize {
        self.ingredients.len()
    }

    pub fn treatment_count(&self) -> usize {
        self.treatments.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate catalog name: {0}")]
    DuplicateName(String),
    #[error("catalog has no {0:?} ingredient")]
    MissingCategory(Category),
}
