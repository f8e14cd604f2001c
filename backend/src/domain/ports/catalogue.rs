//! Port for the read-only ingredient and tag catalogues.

use async_trait::async_trait;

use crate::domain::catalogue::{Ingredient, IngredientId, NewIngredient, Tag, TagId};

use super::RepositoryError;

/// Port for tag and ingredient reference data.
#[async_trait]
pub trait CatalogueRepository: Send + Sync {
    /// All tags, ordered by name. The tag set is small; no pagination.
    async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError>;

    /// Fetch a tag by id.
    async fn find_tag(&self, id: TagId) -> Result<Option<Tag>, RepositoryError>;

    /// Ingredients matching an optional case-insensitive name prefix,
    /// ordered by name.
    async fn list_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>, RepositoryError>;

    /// Fetch an ingredient by id.
    async fn find_ingredient(
        &self,
        id: IngredientId,
    ) -> Result<Option<Ingredient>, RepositoryError>;

    /// Upsert fixture rows by their `(name, measurement_unit)` key.
    ///
    /// Returns the number of newly inserted rows; existing pairs are
    /// left untouched.
    async fn upsert_ingredients(
        &self,
        ingredients: &[NewIngredient],
    ) -> Result<usize, RepositoryError>;
}
