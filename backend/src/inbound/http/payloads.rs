//! Response payloads shared across handler modules.
//!
//! Wire fields are snake_case. Stored media paths are served relative to
//! the `/media/` mount, so payload builders prefix them here and nowhere
//! else.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::catalogue::{Ingredient, Tag};
use crate::domain::ports::{AuthorProfile, RecipeWithFlags};
use crate::domain::recipe::{RecipeRecord, RecipeSummary, ViewerFlags};
use crate::domain::user::User;

/// URL under which a stored media-relative path is served.
pub(crate) fn media_url(path: &str) -> String {
    format!("/media/{path}")
}

/// Public user profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPayload {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the requesting viewer follows this user.
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserPayload {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            id: user.id.0,
            username: user.username.to_string(),
            email: user.email.to_string(),
            first_name: user.first_name.as_ref().to_owned(),
            last_name: user.last_name.as_ref().to_owned(),
            is_subscribed,
            avatar: user.avatar.as_deref().map(media_url),
        }
    }
}

/// Tag payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagPayload {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

impl From<&Tag> for TagPayload {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id.0,
            name: tag.name.clone(),
            slug: tag.slug.clone(),
        }
    }
}

/// Catalogue ingredient payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngredientPayload {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<&Ingredient> for IngredientPayload {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            id: ingredient.id.0,
            name: ingredient.name.clone(),
            measurement_unit: ingredient.measurement_unit.clone(),
        }
    }
}

/// Ingredient as embedded in a recipe, with its amount.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeIngredientPayload {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

/// Full recipe read payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipePayload {
    pub id: i32,
    pub tags: Vec<TagPayload>,
    pub author: UserPayload,
    pub ingredients: Vec<RecipeIngredientPayload>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: u32,
}

impl RecipePayload {
    pub fn new(record: &RecipeRecord, flags: ViewerFlags, author_subscribed: bool) -> Self {
        Self {
            id: record.id.0,
            tags: record.tags.iter().map(TagPayload::from).collect(),
            author: UserPayload::new(&record.author, author_subscribed),
            ingredients: record
                .ingredients
                .iter()
                .map(|(ingredient, amount)| RecipeIngredientPayload {
                    id: ingredient.id.0,
                    name: ingredient.name.clone(),
                    measurement_unit: ingredient.measurement_unit.clone(),
                    amount: *amount,
                })
                .collect(),
            is_favorited: flags.is_favorited,
            is_in_shopping_cart: flags.is_in_shopping_cart,
            name: record.name.clone(),
            image: media_url(&record.image),
            text: record.text.clone(),
            cooking_time: record.cooking_time,
        }
    }

    pub fn from_listed(listed: &RecipeWithFlags, author_subscribed: bool) -> Self {
        Self::new(&listed.record, listed.flags, author_subscribed)
    }
}

/// Abbreviated recipe payload used by favourite, cart, and subscription
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipeSummaryPayload {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: u32,
}

impl From<&RecipeSummary> for RecipeSummaryPayload {
    fn from(summary: &RecipeSummary) -> Self {
        Self {
            id: summary.id.0,
            name: summary.name.clone(),
            image: media_url(&summary.image),
            cooking_time: summary.cooking_time,
        }
    }
}

/// Author profile annotated with a capped recipe list, as returned by the
/// subscription endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscribedAuthorPayload {
    #[serde(flatten)]
    pub user: UserPayload,
    pub recipes: Vec<RecipeSummaryPayload>,
    pub recipes_count: i64,
}

impl SubscribedAuthorPayload {
    pub fn new(profile: &AuthorProfile, recipes: &[RecipeSummary]) -> Self {
        Self {
            // Payloads from these endpoints are always for followed authors.
            user: UserPayload::new(&profile.user, true),
            recipes: recipes.iter().map(RecipeSummaryPayload::from).collect(),
            recipes_count: profile.recipes_count,
        }
    }
}
