//! Catalogue handlers: tags and ingredients, read-only and public.

use actix_web::{HttpResponse, get, web};
use serde::Deserialize;

use crate::domain::Error;
use crate::domain::catalogue::{IngredientId, TagId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::payloads::{IngredientPayload, TagPayload};
use crate::inbound::http::state::HttpState;

/// All tags, unpaginated.
#[utoipa::path(
    get,
    path = "/api/tags/",
    responses((status = 200, description = "Tags", body = [TagPayload])),
    tags = ["catalogue"],
    operation_id = "listTags",
    security([])
)]
#[get("/tags/")]
pub async fn list_tags(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let tags = state.catalogue.list_tags().await?;
    let payload: Vec<TagPayload> = tags.iter().map(TagPayload::from).collect();
    Ok(HttpResponse::Ok().json(payload))
}

/// A single tag.
#[utoipa::path(
    get,
    path = "/api/tags/{id}/",
    params(("id" = i32, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Tag", body = TagPayload),
        (status = 404, description = "No such tag", body = Error),
    ),
    tags = ["catalogue"],
    operation_id = "retrieveTag",
    security([])
)]
#[get("/tags/{id}/")]
pub async fn retrieve_tag(
    state: web::Data<HttpState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let tag = state
        .catalogue
        .find_tag(TagId(path.into_inner()))
        .await?
        .ok_or_else(|| Error::not_found("tag not found"))?;
    Ok(HttpResponse::Ok().json(TagPayload::from(&tag)))
}

/// Ingredient list query parameters.
#[derive(Debug, Deserialize)]
pub struct IngredientParams {
    /// Case-insensitive name prefix.
    name: Option<String>,
}

/// Ingredients, optionally filtered by name prefix, unpaginated.
#[utoipa::path(
    get,
    path = "/api/ingredients/",
    responses((status = 200, description = "Ingredients", body = [IngredientPayload])),
    tags = ["catalogue"],
    operation_id = "listIngredients",
    security([])
)]
#[get("/ingredients/")]
pub async fn list_ingredients(
    state: web::Data<HttpState>,
    params: web::Query<IngredientParams>,
) -> ApiResult<HttpResponse> {
    let ingredients = state
        .catalogue
        .list_ingredients(params.name.as_deref())
        .await?;
    let payload: Vec<IngredientPayload> =
        ingredients.iter().map(IngredientPayload::from).collect();
    Ok(HttpResponse::Ok().json(payload))
}

/// A single ingredient.
#[utoipa::path(
    get,
    path = "/api/ingredients/{id}/",
    params(("id" = i32, Path, description = "Ingredient id")),
    responses(
        (status = 200, description = "Ingredient", body = IngredientPayload),
        (status = 404, description = "No such ingredient", body = Error),
    ),
    tags = ["catalogue"],
    operation_id = "retrieveIngredient",
    security([])
)]
#[get("/ingredients/{id}/")]
pub async fn retrieve_ingredient(
    state: web::Data<HttpState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let ingredient = state
        .catalogue
        .find_ingredient(IngredientId(path.into_inner()))
        .await?
        .ok_or_else(|| Error::not_found("ingredient not found"))?;
    Ok(HttpResponse::Ok().json(IngredientPayload::from(&ingredient)))
}

#[cfg(test)]
mod tests {
    use crate::inbound::http::test_utils::test_app;
    use crate::outbound::InMemoryStore;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[actix_web::test]
    async fn tags_list_is_public_and_sorted() {
        let store = InMemoryStore::new();
        store.seed_tag("Lunch", "lunch");
        store.seed_tag("Breakfast", "breakfast");
        let app = actix_test::init_service(test_app(store)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/tags/").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(response).await;
        let names: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|tag| tag["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Breakfast", "Lunch"]);
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_tag_is_not_found() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/tags/42/")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn ingredient_prefix_filter_is_case_insensitive() {
        let store = InMemoryStore::new();
        store.seed_ingredient("Flour", "g");
        store.seed_ingredient("flaxseed", "g");
        store.seed_ingredient("milk", "ml");
        let app = actix_test::init_service(test_app(store)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/ingredients/?name=fl")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
