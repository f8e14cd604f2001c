//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are
//! used by Diesel for compile-time query validation and type-safe SQL
//! generation; regenerate with `diesel print-schema` after migrating.

diesel::table! {
    /// Registered accounts.
    users (id) {
        id -> Int4,
        #[max_length = 150]
        username -> Varchar,
        #[max_length = 254]
        email -> Varchar,
        #[max_length = 150]
        first_name -> Varchar,
        #[max_length = 150]
        last_name -> Varchar,
        password_hash -> Text,
        /// Media-relative avatar path; null when unset.
        avatar -> Nullable<Text>,
        is_staff -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Directed follow edges; unique per pair, self-follow rejected by a
    /// check constraint.
    subscriptions (id) {
        id -> Int4,
        follower_id -> Int4,
        author_id -> Int4,
    }
}

diesel::table! {
    /// Seeded ingredient catalogue; unique (name, measurement_unit).
    ingredients (id) {
        id -> Int4,
        #[max_length = 128]
        name -> Varchar,
        #[max_length = 64]
        measurement_unit -> Varchar,
    }
}

diesel::table! {
    /// Recipe labels; name and slug each unique.
    tags (id) {
        id -> Int4,
        #[max_length = 200]
        name -> Varchar,
        #[max_length = 200]
        slug -> Varchar,
    }
}

diesel::table! {
    /// User-authored recipes.
    recipes (id) {
        id -> Int4,
        author_id -> Int4,
        #[max_length = 256]
        name -> Varchar,
        image -> Text,
        text -> Text,
        cooking_time -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Ingredient links with amounts; unique (recipe_id, ingredient_id).
    recipe_ingredients (id) {
        id -> Int4,
        recipe_id -> Int4,
        ingredient_id -> Int4,
        amount -> Int4,
    }
}

diesel::table! {
    /// Tag links; unique (recipe_id, tag_id).
    recipe_tags (id) {
        id -> Int4,
        recipe_id -> Int4,
        tag_id -> Int4,
    }
}

diesel::table! {
    /// Bookmarks; unique (user_id, recipe_id).
    favorites (id) {
        id -> Int4,
        user_id -> Int4,
        recipe_id -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Shopping-cart membership; unique (user_id, recipe_id).
    shopping_cart_items (id) {
        id -> Int4,
        user_id -> Int4,
        recipe_id -> Int4,
    }
}

diesel::joinable!(recipes -> users (author_id));
diesel::joinable!(recipe_ingredients -> recipes (recipe_id));
diesel::joinable!(recipe_ingredients -> ingredients (ingredient_id));
diesel::joinable!(recipe_tags -> recipes (recipe_id));
diesel::joinable!(recipe_tags -> tags (tag_id));
diesel::joinable!(favorites -> users (user_id));
diesel::joinable!(favorites -> recipes (recipe_id));
diesel::joinable!(shopping_cart_items -> users (user_id));
diesel::joinable!(shopping_cart_items -> recipes (recipe_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    subscriptions,
    ingredients,
    tags,
    recipes,
    recipe_ingredients,
    recipe_tags,
    favorites,
    shopping_cart_items,
);
