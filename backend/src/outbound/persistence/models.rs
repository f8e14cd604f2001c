//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and
//! must never be exposed to the domain; conversion functions in the
//! adapter modules translate them into domain entities.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::Error;
use crate::domain::catalogue::{Ingredient, IngredientId, Tag, TagId};
use crate::domain::user::{Email, PersonName, User, UserId, Username};

use super::schema::{
    favorites, ingredients, recipe_ingredients, recipe_tags, recipes, shopping_cart_items,
    subscriptions, tags, users,
};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub is_staff: bool,
    #[expect(dead_code, reason = "schema field kept for audit queries")]
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert the row into a domain user.
    ///
    /// Stored values already passed validation on the way in, so a
    /// failure here means the database was edited out of band.
    pub(crate) fn into_user(self) -> Result<User, Error> {
        let row_id = self.id;
        let map_invalid = move |error: crate::domain::user::UserValidationError| {
            Error::internal(format!("user row {row_id} fails validation: {error}"))
        };
        Ok(User {
            id: UserId(self.id),
            username: Username::new(self.username).map_err(map_invalid)?,
            email: Email::new(self.email).map_err(map_invalid)?,
            first_name: PersonName::new(self.first_name).map_err(map_invalid)?,
            last_name: PersonName::new(self.last_name).map_err(map_invalid)?,
            avatar: self.avatar,
            is_staff: self.is_staff,
        })
    }
}

/// Insertable struct for registering users.
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

/// Insertable struct for follow edges.
#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
pub(crate) struct NewSubscriptionRow {
    pub follower_id: i32,
    pub author_id: i32,
}

/// Row struct for reading ingredients.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IngredientRow {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Self {
            id: IngredientId(row.id),
            name: row.name,
            measurement_unit: row.measurement_unit,
        }
    }
}

/// Insertable struct for seeding ingredients.
#[derive(Debug, Insertable)]
#[diesel(table_name = ingredients)]
pub(crate) struct NewIngredientRow<'a> {
    pub name: &'a str,
    pub measurement_unit: &'a str,
}

/// Row struct for reading tags.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TagRow {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Self {
            id: TagId(row.id),
            name: row.name,
            slug: row.slug,
        }
    }
}

/// Row struct for reading recipes.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RecipeRow {
    pub id: i32,
    pub author_id: i32,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating recipes.
#[derive(Debug, Insertable)]
#[diesel(table_name = recipes)]
pub(crate) struct NewRecipeRow<'a> {
    pub author_id: i32,
    pub name: &'a str,
    pub image: &'a str,
    pub text: &'a str,
    pub cooking_time: i32,
}

/// Insertable struct for ingredient links.
#[derive(Debug, Insertable)]
#[diesel(table_name = recipe_ingredients)]
pub(crate) struct NewRecipeIngredientRow {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub amount: i32,
}

/// Insertable struct for tag links.
#[derive(Debug, Insertable)]
#[diesel(table_name = recipe_tags)]
pub(crate) struct NewRecipeTagRow {
    pub recipe_id: i32,
    pub tag_id: i32,
}

/// Insertable struct for favourites.
#[derive(Debug, Insertable)]
#[diesel(table_name = favorites)]
pub(crate) struct NewFavoriteRow {
    pub user_id: i32,
    pub recipe_id: i32,
}

/// Insertable struct for cart entries.
#[derive(Debug, Insertable)]
#[diesel(table_name = shopping_cart_items)]
pub(crate) struct NewShoppingCartItemRow {
    pub user_id: i32,
    pub recipe_id: i32,
}
