//! Port for recipe storage, listing, and viewer-scoped flags.

use async_trait::async_trait;
use pagination::{PageOf, PageRequest};

use crate::domain::catalogue::{IngredientId, TagId};
use crate::domain::recipe::{RecipeDraft, RecipeId, RecipeRecord, RecipeSummary, ViewerFlags};
use crate::domain::user::UserId;

use super::RepositoryError;

/// A recipe together with the requesting viewer's flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeWithFlags {
    pub record: RecipeRecord,
    pub flags: ViewerFlags,
}

/// Failures raised by the recipe write path.
///
/// Referenced-id checks run inside the write transaction, so any of
/// these leaves no partial rows behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeWriteError {
    /// The draft references ingredient ids that do not exist.
    #[error("unknown ingredient ids: {0:?}")]
    UnknownIngredients(Vec<IngredientId>),
    /// The draft references tag ids that do not exist.
    #[error("unknown tag ids: {0:?}")]
    UnknownTags(Vec<TagId>),
    /// The recipe being updated does not exist.
    #[error("recipe not found")]
    NotFound,
    /// Infrastructure failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Filter parameters for the recipe list endpoint.
///
/// The boolean flags are viewer-scoped; they are ignored when `viewer`
/// is `None` (anonymous request).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeListFilter {
    /// Match recipes carrying any of these tag slugs.
    pub tag_slugs: Vec<String>,
    /// Match recipes by this author.
    pub author: Option<UserId>,
    /// Keep (true) or drop (false) recipes the viewer favourited.
    pub is_favorited: Option<bool>,
    /// Keep (true) or drop (false) recipes in the viewer's cart.
    pub is_in_shopping_cart: Option<bool>,
    /// The requesting user, when authenticated.
    pub viewer: Option<UserId>,
}

/// Port for recipe persistence.
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Persist a new recipe with its ingredient and tag links in one
    /// transaction.
    async fn create(
        &self,
        author: UserId,
        draft: &RecipeDraft,
        image_path: &str,
    ) -> Result<RecipeRecord, RecipeWriteError>;

    /// Rewrite a recipe: scalar fields updated, ingredient and tag links
    /// cleared and recreated from the draft, all in one transaction.
    ///
    /// `image_path` replaces the stored image only when `Some`.
    async fn update(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
        image_path: Option<&str>,
    ) -> Result<RecipeRecord, RecipeWriteError>;

    /// Delete a recipe; returns whether it existed. Links, favourites,
    /// and cart rows cascade.
    async fn delete(&self, id: RecipeId) -> Result<bool, RepositoryError>;

    /// Fetch a fully loaded recipe.
    async fn find(&self, id: RecipeId) -> Result<Option<RecipeRecord>, RepositoryError>;

    /// List recipes newest first, applying the filter.
    async fn list(
        &self,
        filter: &RecipeListFilter,
        page: PageRequest,
    ) -> Result<PageOf<RecipeWithFlags>, RepositoryError>;

    /// Newest recipe summaries by one author, capped at `limit`.
    async fn summaries_by_author(
        &self,
        author: UserId,
        limit: u32,
    ) -> Result<Vec<RecipeSummary>, RepositoryError>;

    /// Favourite/cart flags for a single recipe and viewer.
    async fn viewer_flags(
        &self,
        viewer: Option<UserId>,
        recipe: RecipeId,
    ) -> Result<ViewerFlags, RepositoryError>;
}
