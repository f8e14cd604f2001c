//! OpenAPI documentation configuration.
//!
//! Generates the specification for the REST API: every endpoint from the
//! inbound HTTP layer, the wire payload schemas, and the session cookie
//! security scheme. Swagger UI serves the document in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::payloads::{
    IngredientPayload, RecipeIngredientPayload, RecipePayload, RecipeSummaryPayload,
    SubscribedAuthorPayload, TagPayload, UserPayload,
};
use crate::inbound::http::recipes::{IngredientAmountRequest, RecipeRequest};
use crate::inbound::http::users::{AvatarRequest, AvatarResponse, LoginRequest, RegisterRequest};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/auth/login/.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Ladle backend API",
        description = "Recipe publishing, subscriptions, favourites, and shopping lists."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::register,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::me,
        crate::inbound::http::users::set_avatar,
        crate::inbound::http::users::delete_avatar,
        crate::inbound::http::users::retrieve_user,
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::subscriptions::subscribe,
        crate::inbound::http::subscriptions::unsubscribe,
        crate::inbound::http::subscriptions::list_subscriptions,
        crate::inbound::http::catalogue::list_tags,
        crate::inbound::http::catalogue::retrieve_tag,
        crate::inbound::http::catalogue::list_ingredients,
        crate::inbound::http::catalogue::retrieve_ingredient,
        crate::inbound::http::recipes::create_recipe,
        crate::inbound::http::recipes::list_recipes,
        crate::inbound::http::recipes::download_shopping_cart,
        crate::inbound::http::recipes::retrieve_recipe,
        crate::inbound::http::recipes::update_recipe,
        crate::inbound::http::recipes::delete_recipe,
        crate::inbound::http::recipes::short_url,
        crate::inbound::http::recipes::add_favorite,
        crate::inbound::http::recipes::remove_favorite,
        crate::inbound::http::recipes::add_to_cart,
        crate::inbound::http::recipes::remove_from_cart,
    ),
    components(schemas(
        Error,
        ErrorCode,
        UserPayload,
        TagPayload,
        IngredientPayload,
        RecipeIngredientPayload,
        RecipePayload,
        RecipeSummaryPayload,
        SubscribedAuthorPayload,
        RegisterRequest,
        AvatarRequest,
        AvatarResponse,
        LoginRequest,
        RecipeRequest,
        IngredientAmountRequest,
    )),
    tags(
        (name = "users", description = "Accounts, profiles, and avatars"),
        (name = "auth", description = "Session login and logout"),
        (name = "subscriptions", description = "Following authors"),
        (name = "catalogue", description = "Tags and the ingredient reference list"),
        (name = "recipes", description = "Recipes, favourites, and the shopping cart")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get("Error").expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
    }

    #[test]
    fn openapi_registers_every_recipe_operation() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/recipes/",
            "/api/recipes/{id}/",
            "/api/recipes/{id}/favorite/",
            "/api/recipes/{id}/shopping_cart/",
            "/api/recipes/download_shopping_cart/",
            "/api/recipes/{id}/short-url/",
        ] {
            assert!(
                doc.paths.paths.contains_key(path),
                "missing path '{path}'"
            );
        }
    }
}
