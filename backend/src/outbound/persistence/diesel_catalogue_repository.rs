//! PostgreSQL-backed [`CatalogueRepository`] implementation using Diesel.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::catalogue::{Ingredient, IngredientId, NewIngredient, Tag, TagId};
use crate::domain::ports::{CatalogueRepository, RepositoryError};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{IngredientRow, NewIngredientRow, TagRow};
use super::pool::DbPool;
use super::schema::{ingredients, tags};

/// Diesel-backed implementation of the [`CatalogueRepository`] port.
#[derive(Clone)]
pub struct DieselCatalogueRepository {
    pool: DbPool,
}

impl DieselCatalogueRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE metacharacters so a prefix search treats them literally.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl CatalogueRepository for DieselCatalogueRepository {
    async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<TagRow> = tags::table
            .order_by(tags::name)
            .select(TagRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn find_tag(&self, id: TagId) -> Result<Option<Tag>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<TagRow> = tags::table
            .find(id.0)
            .select(TagRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Tag::from))
    }

    async fn list_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = ingredients::table.into_boxed();
        if let Some(prefix) = name_prefix {
            let pattern = format!("{}%", escape_like(prefix));
            query = query.filter(ingredients::name.ilike(pattern));
        }
        let rows: Vec<IngredientRow> = query
            .order_by(ingredients::name)
            .select(IngredientRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    async fn find_ingredient(
        &self,
        id: IngredientId,
    ) -> Result<Option<Ingredient>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<IngredientRow> = ingredients::table
            .find(id.0)
            .select(IngredientRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(Ingredient::from))
    }

    async fn upsert_ingredients(
        &self,
        new_ingredients: &[NewIngredient],
    ) -> Result<usize, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<NewIngredientRow<'_>> = new_ingredients
            .iter()
            .map(|ingredient| NewIngredientRow {
                name: &ingredient.name,
                measurement_unit: &ingredient.measurement_unit,
            })
            .collect();
        let inserted = diesel::insert_into(ingredients::table)
            .values(&rows)
            .on_conflict((ingredients::name, ingredients::measurement_unit))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("flour", "flour")]
    #[case("50%", "50\\%")]
    #[case("a_b", "a\\_b")]
    #[case("back\\slash", "back\\\\slash")]
    fn escape_like_neutralises_metacharacters(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_like(raw), expected);
    }
}
