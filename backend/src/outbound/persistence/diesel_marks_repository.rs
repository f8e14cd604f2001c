//! PostgreSQL-backed [`MarksRepository`] implementation using Diesel.
//!
//! Favourites and cart rows share insert/delete semantics; the shopping
//! list aggregation sums ingredient amounts across every recipe in the
//! viewer's cart in one grouped query.

use async_trait::async_trait;
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{MarkError, MarksRepository, RepositoryError};
use crate::domain::recipe::RecipeId;
use crate::domain::shopping_list::ShoppingListLine;
use crate::domain::user::UserId;

use super::error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{NewFavoriteRow, NewShoppingCartItemRow};
use super::pool::DbPool;
use super::schema::{favorites, ingredients, recipe_ingredients, shopping_cart_items};

/// Diesel-backed implementation of the [`MarksRepository`] port.
#[derive(Clone)]
pub struct DieselMarksRepository {
    pool: DbPool,
}

impl DieselMarksRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(error: diesel::result::Error) -> MarkError {
    if is_unique_violation(&error, None) {
        MarkError::Duplicate
    } else {
        MarkError::Repository(map_diesel_error(error))
    }
}

#[async_trait]
impl MarksRepository for DieselMarksRepository {
    async fn add_favorite(&self, user: UserId, recipe: RecipeId) -> Result<(), MarkError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewFavoriteRow {
            user_id: user.0,
            recipe_id: recipe.0,
        };
        diesel::insert_into(favorites::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_insert_error)?;
        Ok(())
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(
            favorites::table
                .filter(favorites::user_id.eq(user.0))
                .filter(favorites::recipe_id.eq(recipe.0)),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn add_to_cart(&self, user: UserId, recipe: RecipeId) -> Result<(), MarkError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewShoppingCartItemRow {
            user_id: user.0,
            recipe_id: recipe.0,
        };
        diesel::insert_into(shopping_cart_items::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_insert_error)?;
        Ok(())
    }

    async fn remove_from_cart(
        &self,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(
            shopping_cart_items::table
                .filter(shopping_cart_items::user_id.eq(user.0))
                .filter(shopping_cart_items::recipe_id.eq(recipe.0)),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn shopping_list(
        &self,
        user: UserId,
    ) -> Result<Vec<ShoppingListLine>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let carted = shopping_cart_items::table
            .filter(shopping_cart_items::user_id.eq(user.0))
            .select(shopping_cart_items::recipe_id);
        let groups: Vec<(String, String, Option<i64>)> = recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq_any(carted))
            .group_by((ingredients::name, ingredients::measurement_unit))
            .select((
                ingredients::name,
                ingredients::measurement_unit,
                sum(recipe_ingredients::amount),
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(groups
            .into_iter()
            .map(|(name, measurement_unit, total)| ShoppingListLine {
                name,
                measurement_unit,
                total: total.unwrap_or(0),
            })
            .collect())
    }
}
