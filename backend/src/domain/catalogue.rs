//! Ingredient and tag reference data.
//!
//! Both catalogues are read-only over HTTP: tags are managed out of band
//! and ingredients are seeded from a CSV fixture.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum length for ingredient names.
pub const INGREDIENT_NAME_MAX: usize = 128;
/// Maximum length for measurement units.
pub const MEASUREMENT_UNIT_MAX: usize = 64;
/// Maximum length for tag names and slugs.
pub const TAG_MAX: usize = 200;

/// Stable ingredient identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(pub i32);

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable tag identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i32);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A seeded ingredient with its measurement unit.
///
/// `(name, measurement_unit)` pairs are unique; the same name may appear
/// with different units (e.g. "sugar"/"g" and "sugar"/"tbsp").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

/// Unsaved ingredient parsed from the CSV fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

/// Errors raised when interpreting a CSV fixture row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngredientParseError {
    #[error("ingredient name must not be empty")]
    EmptyName,
    #[error("measurement unit must not be empty")]
    EmptyUnit,
    #[error("ingredient name must be at most {INGREDIENT_NAME_MAX} characters")]
    NameTooLong,
    #[error("measurement unit must be at most {MEASUREMENT_UNIT_MAX} characters")]
    UnitTooLong,
}

impl NewIngredient {
    /// Validate a `(name, measurement_unit)` pair from the fixture file.
    pub fn new(name: &str, measurement_unit: &str) -> Result<Self, IngredientParseError> {
        let name = name.trim();
        let measurement_unit = measurement_unit.trim();
        if name.is_empty() {
            return Err(IngredientParseError::EmptyName);
        }
        if measurement_unit.is_empty() {
            return Err(IngredientParseError::EmptyUnit);
        }
        if name.chars().count() > INGREDIENT_NAME_MAX {
            return Err(IngredientParseError::NameTooLong);
        }
        if measurement_unit.chars().count() > MEASUREMENT_UNIT_MAX {
            return Err(IngredientParseError::UnitTooLong);
        }
        Ok(Self {
            name: name.to_owned(),
            measurement_unit: measurement_unit.to_owned(),
        })
    }
}

/// A labelling category attachable to recipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// URL-safe identifier used by the recipe list filter.
    pub slug: String,
}
