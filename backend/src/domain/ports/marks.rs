//! Port for favourites, the shopping cart, and the aggregated list.
//!
//! Favourites and cart items are structurally identical `(user, recipe)`
//! pairs with the same add/remove semantics, so one port covers both.

use async_trait::async_trait;

use crate::domain::recipe::RecipeId;
use crate::domain::shopping_list::ShoppingListLine;
use crate::domain::user::UserId;

use super::RepositoryError;

/// Failures raised while adding a favourite or cart entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkError {
    /// The `(user, recipe)` pair already exists.
    ///
    /// Concurrent duplicate adds lose the unique-constraint race and
    /// surface here as well.
    #[error("entry already exists")]
    Duplicate,
    /// Infrastructure failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Port for user-recipe marks.
#[async_trait]
pub trait MarksRepository: Send + Sync {
    /// Record a favourite.
    async fn add_favorite(&self, user: UserId, recipe: RecipeId) -> Result<(), MarkError>;

    /// Delete a favourite; returns whether one existed.
    async fn remove_favorite(&self, user: UserId, recipe: RecipeId)
    -> Result<bool, RepositoryError>;

    /// Put a recipe into the shopping cart.
    async fn add_to_cart(&self, user: UserId, recipe: RecipeId) -> Result<(), MarkError>;

    /// Remove a recipe from the cart; returns whether it was there.
    async fn remove_from_cart(
        &self,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, RepositoryError>;

    /// Aggregate the viewer's cart: ingredient rows of every cart recipe
    /// grouped by `(name, measurement_unit)` with summed amounts.
    async fn shopping_list(&self, user: UserId)
    -> Result<Vec<ShoppingListLine>, RepositoryError>;
}
