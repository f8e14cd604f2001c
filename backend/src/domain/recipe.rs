//! Recipe aggregate and write-side validation.
//!
//! A [`RecipeDraft`] is the only way to hand recipe input to a repository:
//! its constructor enforces every invariant that does not need database
//! access (non-empty unique ingredient and tag lists, amount bounds,
//! cooking time minimum). Existence of the referenced ids is checked by
//! the repository inside the write transaction.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalogue::{Ingredient, IngredientId, Tag, TagId};
use super::user::{User, UserId};

/// Minimum ingredient amount per recipe link.
pub const AMOUNT_MIN: u32 = 1;
/// Maximum ingredient amount per recipe link.
pub const AMOUNT_MAX: u32 = 5000;
/// Minimum cooking time in minutes.
pub const COOKING_TIME_MIN: u32 = 1;
/// Maximum length of a recipe name.
pub const RECIPE_NAME_MAX: usize = 256;

/// Stable recipe identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(pub i32);

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validation errors raised by [`RecipeDraft::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeValidationError {
    EmptyName,
    NameTooLong { max: usize },
    EmptyText,
    CookingTimeTooShort { min: u32 },
    NoIngredients,
    DuplicateIngredient { id: IngredientId },
    AmountOutOfRange { id: IngredientId, amount: u32 },
    NoTags,
    DuplicateTag { id: TagId },
}

impl fmt::Display for RecipeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "recipe name must not be empty"),
            Self::NameTooLong { max } => {
                write!(f, "recipe name must be at most {max} characters")
            }
            Self::EmptyText => write!(f, "recipe text must not be empty"),
            Self::CookingTimeTooShort { min } => {
                write!(f, "cooking time must be at least {min} minute(s)")
            }
            Self::NoIngredients => write!(f, "recipe needs at least one ingredient"),
            Self::DuplicateIngredient { id } => {
                write!(f, "ingredient {id} is listed more than once")
            }
            Self::AmountOutOfRange { id, amount } => write!(
                f,
                "amount {amount} for ingredient {id} must be within [{AMOUNT_MIN}, {AMOUNT_MAX}]",
            ),
            Self::NoTags => write!(f, "recipe needs at least one tag"),
            Self::DuplicateTag { id } => write!(f, "tag {id} is listed more than once"),
        }
    }
}

impl std::error::Error for RecipeValidationError {}

/// Requested link between a recipe and an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient: IngredientId,
    pub amount: u32,
}

/// Validated recipe input, shared by create and update paths.
///
/// On update the ingredient and tag links replace the existing ones
/// wholesale; drafts are never merged with prior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    name: String,
    text: String,
    cooking_time: u32,
    ingredients: Vec<IngredientAmount>,
    tags: Vec<TagId>,
}

impl RecipeDraft {
    /// Validate recipe input.
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        cooking_time: u32,
        ingredients: Vec<IngredientAmount>,
        tags: Vec<TagId>,
    ) -> Result<Self, RecipeValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RecipeValidationError::EmptyName);
        }
        if name.chars().count() > RECIPE_NAME_MAX {
            return Err(RecipeValidationError::NameTooLong {
                max: RECIPE_NAME_MAX,
            });
        }
        let text = text.into();
        if text.trim().is_empty() {
            return Err(RecipeValidationError::EmptyText);
        }
        if cooking_time < COOKING_TIME_MIN {
            return Err(RecipeValidationError::CookingTimeTooShort {
                min: COOKING_TIME_MIN,
            });
        }

        if ingredients.is_empty() {
            return Err(RecipeValidationError::NoIngredients);
        }
        let mut seen = HashSet::new();
        for entry in &ingredients {
            if !seen.insert(entry.ingredient) {
                return Err(RecipeValidationError::DuplicateIngredient {
                    id: entry.ingredient,
                });
            }
            if entry.amount < AMOUNT_MIN || entry.amount > AMOUNT_MAX {
                return Err(RecipeValidationError::AmountOutOfRange {
                    id: entry.ingredient,
                    amount: entry.amount,
                });
            }
        }

        if tags.is_empty() {
            return Err(RecipeValidationError::NoTags);
        }
        let mut seen_tags = HashSet::new();
        for tag in &tags {
            if !seen_tags.insert(*tag) {
                return Err(RecipeValidationError::DuplicateTag { id: *tag });
            }
        }

        Ok(Self {
            name,
            text,
            cooking_time,
            ingredients,
            tags,
        })
    }

    /// Recipe display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Preparation instructions.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cooking time in minutes.
    pub fn cooking_time(&self) -> u32 {
        self.cooking_time
    }

    /// Requested ingredient links, unique by ingredient id.
    pub fn ingredients(&self) -> &[IngredientAmount] {
        &self.ingredients
    }

    /// Requested tag links, unique.
    pub fn tags(&self) -> &[TagId] {
        &self.tags
    }
}

/// Fully loaded recipe as served by read endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRecord {
    pub id: RecipeId,
    pub author: User,
    pub name: String,
    /// Media-relative path of the stored image.
    pub image: String,
    pub text: String,
    pub cooking_time: u32,
    pub ingredients: Vec<(Ingredient, u32)>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
}

/// Abbreviated recipe used by favourite/cart responses and subscription
/// payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: u32,
}

impl From<&RecipeRecord> for RecipeSummary {
    fn from(record: &RecipeRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            image: record.image.clone(),
            cooking_time: record.cooking_time,
        }
    }
}

/// Per-viewer flags attached to a recipe payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Whether `viewer` may mutate a recipe owned by `author`.
///
/// Safe methods never reach this check; it gates update and delete only.
pub fn can_modify(viewer: &User, author: UserId) -> bool {
    viewer.id == author || viewer.is_staff
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(id: i32, amount: u32) -> IngredientAmount {
        IngredientAmount {
            ingredient: IngredientId(id),
            amount,
        }
    }

    fn draft(
        ingredients: Vec<IngredientAmount>,
        tags: Vec<TagId>,
    ) -> Result<RecipeDraft, RecipeValidationError> {
        RecipeDraft::new("Tea", "Boil water, add leaves.", 2, ingredients, tags)
    }

    #[rstest]
    fn accepts_valid_draft() {
        let draft = draft(vec![entry(5, 1)], vec![TagId(1)]).unwrap();
        assert_eq!(draft.name(), "Tea");
        assert_eq!(draft.ingredients().len(), 1);
        assert_eq!(draft.tags(), &[TagId(1)]);
    }

    #[rstest]
    fn rejects_empty_ingredients() {
        assert_eq!(
            draft(vec![], vec![TagId(1)]).unwrap_err(),
            RecipeValidationError::NoIngredients
        );
    }

    #[rstest]
    fn rejects_duplicate_ingredient_ids() {
        assert_eq!(
            draft(vec![entry(5, 1), entry(5, 2)], vec![TagId(1)]).unwrap_err(),
            RecipeValidationError::DuplicateIngredient {
                id: IngredientId(5)
            }
        );
    }

    #[rstest]
    #[case(0)]
    #[case(AMOUNT_MAX + 1)]
    fn rejects_amount_out_of_range(#[case] amount: u32) {
        assert_eq!(
            draft(vec![entry(5, amount)], vec![TagId(1)]).unwrap_err(),
            RecipeValidationError::AmountOutOfRange {
                id: IngredientId(5),
                amount,
            }
        );
    }

    #[rstest]
    fn rejects_empty_and_duplicate_tags() {
        assert_eq!(
            draft(vec![entry(5, 1)], vec![]).unwrap_err(),
            RecipeValidationError::NoTags
        );
        assert_eq!(
            draft(vec![entry(5, 1)], vec![TagId(1), TagId(1)]).unwrap_err(),
            RecipeValidationError::DuplicateTag { id: TagId(1) }
        );
    }

    #[rstest]
    fn rejects_zero_cooking_time() {
        let result = RecipeDraft::new("Tea", "text", 0, vec![entry(5, 1)], vec![TagId(1)]);
        assert_eq!(
            result.unwrap_err(),
            RecipeValidationError::CookingTimeTooShort {
                min: COOKING_TIME_MIN
            }
        );
    }

    #[rstest]
    fn staff_may_modify_foreign_recipes() {
        use crate::domain::user::{Email, PersonName, Username};

        let viewer = User {
            id: UserId(2),
            username: Username::new("staffer").unwrap(),
            email: Email::new("staff@example.org").unwrap(),
            first_name: PersonName::new("Staff").unwrap(),
            last_name: PersonName::new("User").unwrap(),
            avatar: None,
            is_staff: true,
        };
        assert!(can_modify(&viewer, UserId(1)));

        let mut plain = viewer.clone();
        plain.is_staff = false;
        assert!(!can_modify(&plain, UserId(1)));
        assert!(can_modify(&plain, UserId(2)));
    }
}
