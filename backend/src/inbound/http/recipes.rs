//! Recipe handlers: CRUD, favourites, the shopping cart, and the
//! downloadable shopping list.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use pagination::{PageOf, PageRequest, Paginated};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::domain::Error;
use crate::domain::catalogue::{IngredientId, TagId};
use crate::domain::image::ImageUpload;
use crate::domain::ports::{MarkError, MediaCategory, RecipeListFilter, RecipeWriteError};
use crate::domain::recipe::{
    IngredientAmount, RecipeDraft, RecipeId, RecipeRecord, RecipeSummary, RecipeValidationError,
    can_modify,
};
use crate::domain::shopping_list;
use crate::domain::user::UserId;
use crate::inbound::http::ApiResult;
use crate::inbound::http::payloads::{RecipePayload, RecipeSummaryPayload};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::{PageParams, viewer_subscribed};

/// Ingredient reference in a recipe write request.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct IngredientAmountRequest {
    pub id: i32,
    pub amount: u32,
}

/// Recipe create/update request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RecipeRequest {
    pub ingredients: Vec<IngredientAmountRequest>,
    pub tags: Vec<i32>,
    /// Base64 data URI; required on create, optional on update.
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
}

fn draft_field(error: &RecipeValidationError) -> &'static str {
    match error {
        RecipeValidationError::EmptyName | RecipeValidationError::NameTooLong { .. } => "name",
        RecipeValidationError::EmptyText => "text",
        RecipeValidationError::CookingTimeTooShort { .. } => "cooking_time",
        RecipeValidationError::NoIngredients
        | RecipeValidationError::DuplicateIngredient { .. }
        | RecipeValidationError::AmountOutOfRange { .. } => "ingredients",
        RecipeValidationError::NoTags | RecipeValidationError::DuplicateTag { .. } => "tags",
    }
}

fn build_draft(body: &RecipeRequest) -> Result<RecipeDraft, Error> {
    let ingredients = body
        .ingredients
        .iter()
        .map(|entry| IngredientAmount {
            ingredient: IngredientId(entry.id),
            amount: entry.amount,
        })
        .collect();
    let tags = body.tags.iter().map(|id| TagId(*id)).collect();
    RecipeDraft::new(
        body.name.clone(),
        body.text.clone(),
        body.cooking_time,
        ingredients,
        tags,
    )
    .map_err(|error| Error::field_validation(draft_field(&error), "invalid", error.to_string()))
}

fn map_write_error(error: RecipeWriteError) -> Error {
    match error {
        RecipeWriteError::UnknownIngredients(_) => {
            Error::field_validation("ingredients", "unknown_ids", error.to_string())
        }
        RecipeWriteError::UnknownTags(_) => {
            Error::field_validation("tags", "unknown_ids", error.to_string())
        }
        RecipeWriteError::NotFound => Error::not_found("recipe not found"),
        RecipeWriteError::Repository(repo) => repo.into(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Parse the recipe list query string: repeatable `tags`, `author`, the
/// viewer-scoped boolean flags, and pagination.
fn parse_list_query(
    query: &str,
    viewer: Option<UserId>,
) -> Result<(RecipeListFilter, PageRequest), Error> {
    let mut filter = RecipeListFilter {
        viewer,
        ..RecipeListFilter::default()
    };
    let mut page = None;
    let mut limit = None;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "tags" => filter.tag_slugs.push(value.into_owned()),
            "author" => {
                let id = value.parse::<i32>().map_err(|_| {
                    Error::field_validation("author", "invalid", "author must be an id")
                })?;
                filter.author = Some(UserId(id));
            }
            "is_favorited" => filter.is_favorited = parse_bool(&value),
            "is_in_shopping_cart" => filter.is_in_shopping_cart = parse_bool(&value),
            "page" => {
                page = Some(value.parse::<u32>().map_err(|_| {
                    Error::field_validation("page", "invalid", "page must be a number")
                })?);
            }
            "limit" => {
                limit = Some(value.parse::<u32>().map_err(|_| {
                    Error::field_validation("limit", "invalid", "limit must be a number")
                })?);
            }
            _ => {}
        }
    }

    let request = PageParams::from_parts(page, limit)?;
    Ok((filter, request))
}

async fn recipe_payload(
    state: &HttpState,
    viewer: Option<UserId>,
    record: &RecipeRecord,
) -> Result<RecipePayload, Error> {
    let flags = state.recipes.viewer_flags(viewer, record.id).await?;
    let author_subscribed = viewer_subscribed(state, viewer, record.author.id).await?;
    Ok(RecipePayload::new(record, flags, author_subscribed))
}

/// Publish a recipe.
#[utoipa::path(
    post,
    path = "/api/recipes/",
    request_body = RecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipePayload),
        (status = 400, description = "Validation failure", body = Error),
        (status = 401, description = "Not logged in", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "createRecipe"
)]
#[post("/recipes/")]
pub async fn create_recipe(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RecipeRequest>,
) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let body = payload.into_inner();
    let draft = build_draft(&body)?;

    let image = body.image.as_deref().ok_or_else(|| {
        Error::field_validation("image", "required", "image is required when creating a recipe")
    })?;
    let upload = ImageUpload::from_data_uri(image)
        .map_err(|error| Error::field_validation("image", "invalid_image", error.to_string()))?;
    let stored = state
        .media
        .save(&upload, MediaCategory::RecipeImages)
        .await
        .map_err(|error| Error::internal(format!("image store failed: {error}")))?;

    let record = match state.recipes.create(viewer, &draft, &stored).await {
        Ok(record) => record,
        Err(error) => {
            // The image was written before the transaction; reclaim it.
            if let Err(cleanup) = state.media.delete(&stored).await {
                tracing::warn!(%cleanup, path = stored, "failed to reclaim recipe image");
            }
            return Err(map_write_error(error));
        }
    };

    let payload = recipe_payload(&state, Some(viewer), &record).await?;
    Ok(HttpResponse::Created().json(payload))
}

/// List recipes, newest first, filtered and paginated.
#[utoipa::path(
    get,
    path = "/api/recipes/",
    responses((status = 200, description = "Page of recipes")),
    tags = ["recipes"],
    operation_id = "listRecipes",
    security([])
)]
#[get("/recipes/")]
pub async fn list_recipes(
    state: web::Data<HttpState>,
    session: SessionContext,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let viewer = session.user_id()?;
    let (filter, request) = parse_list_query(req.query_string(), viewer)?;

    let page = state.recipes.list(&filter, request).await?;
    let mut results = Vec::with_capacity(page.items.len());
    for listed in &page.items {
        let author_subscribed =
            viewer_subscribed(&state, viewer, listed.record.author.id).await?;
        results.push(RecipePayload::from_listed(listed, author_subscribed));
    }
    let page = PageOf::new(page.count, results);
    Ok(HttpResponse::Ok().json(Paginated::envelope(
        req.path(),
        req.query_string(),
        &request,
        page,
    )))
}

/// The viewer's aggregated shopping list as a plain-text attachment.
#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart/",
    responses(
        (status = 200, description = "Aggregated shopping list", content_type = "text/plain"),
        (status = 401, description = "Not logged in", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "downloadShoppingCart"
)]
#[get("/recipes/download_shopping_cart/")]
pub async fn download_shopping_cart(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let lines = state.marks.shopping_list(viewer).await?;
    let document = shopping_list::render(lines);
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"shopping_list.txt\"",
        ))
        .body(document))
}

/// A single recipe.
#[utoipa::path(
    get,
    path = "/api/recipes/{id}/",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe", body = RecipePayload),
        (status = 404, description = "No such recipe", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "retrieveRecipe",
    security([])
)]
#[get("/recipes/{id}/")]
pub async fn retrieve_recipe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let id = RecipeId(path.into_inner());
    let record = state
        .recipes
        .find(id)
        .await?
        .ok_or_else(|| Error::not_found("recipe not found"))?;
    let payload = recipe_payload(&state, session.user_id()?, &record).await?;
    Ok(HttpResponse::Ok().json(payload))
}

/// Look up a recipe and check the viewer may mutate it.
async fn find_owned(
    state: &HttpState,
    viewer: UserId,
    id: RecipeId,
) -> Result<RecipeRecord, Error> {
    let record = state
        .recipes
        .find(id)
        .await?
        .ok_or_else(|| Error::not_found("recipe not found"))?;
    let user = state
        .users
        .find_by_id(viewer)
        .await?
        .ok_or_else(|| Error::unauthorized("login required"))?;
    if !can_modify(&user, record.author.id) {
        return Err(Error::forbidden("only the author may modify this recipe"));
    }
    Ok(record)
}

/// Rewrite a recipe; author or staff only.
#[utoipa::path(
    patch,
    path = "/api/recipes/{id}/",
    params(("id" = i32, Path, description = "Recipe id")),
    request_body = RecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipePayload),
        (status = 400, description = "Validation failure", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "No such recipe", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "updateRecipe"
)]
#[patch("/recipes/{id}/")]
pub async fn update_recipe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    payload: web::Json<RecipeRequest>,
) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let id = RecipeId(path.into_inner());
    let existing = find_owned(&state, viewer, id).await?;

    let body = payload.into_inner();
    let draft = build_draft(&body)?;

    let stored = match body.image.as_deref() {
        Some(image) => {
            let upload = ImageUpload::from_data_uri(image).map_err(|error| {
                Error::field_validation("image", "invalid_image", error.to_string())
            })?;
            Some(
                state
                    .media
                    .save(&upload, MediaCategory::RecipeImages)
                    .await
                    .map_err(|error| Error::internal(format!("image store failed: {error}")))?,
            )
        }
        None => None,
    };

    let record = state
        .recipes
        .update(id, &draft, stored.as_deref())
        .await
        .map_err(map_write_error)?;
    if stored.is_some()
        && let Err(cleanup) = state.media.delete(&existing.image).await
    {
        tracing::warn!(%cleanup, path = existing.image, "failed to remove replaced recipe image");
    }

    let payload = recipe_payload(&state, Some(viewer), &record).await?;
    Ok(HttpResponse::Ok().json(payload))
}

/// Delete a recipe; author or staff only.
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "No such recipe", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "deleteRecipe"
)]
#[delete("/recipes/{id}/")]
pub async fn delete_recipe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let id = RecipeId(path.into_inner());
    let record = find_owned(&state, viewer, id).await?;

    state.recipes.delete(id).await?;
    if let Err(cleanup) = state.media.delete(&record.image).await {
        tracing::warn!(%cleanup, path = record.image, "failed to remove deleted recipe image");
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Redirect from a recipe's short link to its canonical page.
#[utoipa::path(
    get,
    path = "/api/recipes/{id}/short-url/",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 302, description = "Redirect to the recipe"),
        (status = 404, description = "No such recipe", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "recipeShortUrl",
    security([])
)]
#[get("/recipes/{id}/short-url/")]
pub async fn short_url(
    state: web::Data<HttpState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let id = RecipeId(path.into_inner());
    if state.recipes.find(id).await?.is_none() {
        return Err(Error::not_found("recipe not found"));
    }
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, format!("/recipes/{}", id.0)))
        .finish())
}

/// The two user-recipe mark kinds share handler logic.
#[derive(Clone, Copy)]
enum MarkKind {
    Favorite,
    Cart,
}

impl MarkKind {
    fn list_name(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::Cart => "shopping cart",
        }
    }
}

async fn add_mark(
    state: &HttpState,
    session: &SessionContext,
    recipe_id: i32,
    kind: MarkKind,
) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let id = RecipeId(recipe_id);
    let record = state
        .recipes
        .find(id)
        .await?
        .ok_or_else(|| Error::not_found("recipe not found"))?;

    let result = match kind {
        MarkKind::Favorite => state.marks.add_favorite(viewer, id).await,
        MarkKind::Cart => state.marks.add_to_cart(viewer, id).await,
    };
    result.map_err(|error| match error {
        MarkError::Duplicate => Error::invalid_request(format!(
            "recipe is already in {}",
            kind.list_name()
        )),
        MarkError::Repository(repo) => repo.into(),
    })?;

    let summary = RecipeSummary::from(&record);
    Ok(HttpResponse::Created().json(RecipeSummaryPayload::from(&summary)))
}

async fn remove_mark(
    state: &HttpState,
    session: &SessionContext,
    recipe_id: i32,
    kind: MarkKind,
) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let id = RecipeId(recipe_id);

    let removed = match kind {
        MarkKind::Favorite => state.marks.remove_favorite(viewer, id).await?,
        MarkKind::Cart => state.marks.remove_from_cart(viewer, id).await?,
    };
    if !removed {
        return Err(Error::not_found(format!(
            "recipe is not in {}",
            kind.list_name()
        )));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Add a recipe to the viewer's favourites.
#[utoipa::path(
    post,
    path = "/api/recipes/{id}/favorite/",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 201, description = "Added", body = RecipeSummaryPayload),
        (status = 400, description = "Already in favourites", body = Error),
        (status = 404, description = "No such recipe", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "addFavorite"
)]
#[post("/recipes/{id}/favorite/")]
pub async fn add_favorite(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    add_mark(&state, &session, path.into_inner(), MarkKind::Favorite).await
}

/// Remove a recipe from the viewer's favourites.
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/favorite/",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Not in favourites", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "removeFavorite"
)]
#[delete("/recipes/{id}/favorite/")]
pub async fn remove_favorite(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    remove_mark(&state, &session, path.into_inner(), MarkKind::Favorite).await
}

/// Put a recipe into the viewer's shopping cart.
#[utoipa::path(
    post,
    path = "/api/recipes/{id}/shopping_cart/",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 201, description = "Added", body = RecipeSummaryPayload),
        (status = 400, description = "Already in the cart", body = Error),
        (status = 404, description = "No such recipe", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "addToCart"
)]
#[post("/recipes/{id}/shopping_cart/")]
pub async fn add_to_cart(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    add_mark(&state, &session, path.into_inner(), MarkKind::Cart).await
}

/// Remove a recipe from the viewer's shopping cart.
#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/shopping_cart/",
    params(("id" = i32, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Not in the cart", body = Error),
    ),
    tags = ["recipes"],
    operation_id = "removeFromCart"
)]
#[delete("/recipes/{id}/shopping_cart/")]
pub async fn remove_from_cart(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    remove_mark(&state, &session, path.into_inner(), MarkKind::Cart).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{register_user, seeded_store, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{Value, json};

    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk\
YPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn recipe_body(name: &str) -> Value {
        json!({
            "ingredients": [{"id": 1, "amount": 200}],
            "tags": [1],
            "image": format!("data:image/png;base64,{PNG_B64}"),
            "name": name,
            "text": "Mix and bake.",
            "cooking_time": 30,
        })
    }

    async fn create_recipe_as(
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
        cookie: &actix_web::cookie::Cookie<'static>,
        name: &str,
    ) -> Value {
        let response = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri("/api/recipes/")
                .cookie(cookie.clone())
                .set_json(recipe_body(name))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        actix_test::read_body_json(response).await
    }

    #[rstest]
    #[actix_web::test]
    async fn create_returns_full_read_payload() {
        let app = actix_test::init_service(test_app(seeded_store())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let value = create_recipe_as(&app, &cookie, "Pancakes").await;
        assert_eq!(value["name"], "Pancakes");
        assert_eq!(value["author"]["username"], "ada");
        assert_eq!(value["is_favorited"], false);
        assert_eq!(value["is_in_shopping_cart"], false);
        assert_eq!(value["ingredients"][0]["amount"], 200);
        assert_eq!(value["tags"][0]["slug"], "breakfast");
        assert!(value["image"].as_str().unwrap().starts_with("/media/recipes/images/"));
    }

    #[rstest]
    #[actix_web::test]
    async fn create_requires_image() {
        let app = actix_test::init_service(test_app(seeded_store())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let mut body = recipe_body("Pancakes");
        body["image"] = Value::Null;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/recipes/")
                .cookie(cookie)
                .set_json(body)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["details"]["field"], "image");
    }

    #[rstest]
    #[actix_web::test]
    async fn create_rejects_unknown_ingredient_ids() {
        let app = actix_test::init_service(test_app(seeded_store())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let mut body = recipe_body("Pancakes");
        body["ingredients"] = json!([{"id": 99, "amount": 10}]);
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/recipes/")
                .cookie(cookie)
                .set_json(body)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["details"]["code"], "unknown_ids");
    }

    #[rstest]
    #[actix_web::test]
    async fn list_filters_by_tag_slug() {
        let store = seeded_store();
        store.seed_tag("Dinner", "dinner");
        let app = actix_test::init_service(test_app(store)).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        create_recipe_as(&app, &cookie, "Pancakes").await;
        let mut dinner = recipe_body("Stew");
        dinner["tags"] = json!([2]);
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/recipes/")
                .cookie(cookie.clone())
                .set_json(dinner)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/recipes/?tags=dinner")
                .to_request(),
        )
        .await;
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["count"], 1);
        assert_eq!(value["results"][0]["name"], "Stew");
    }

    #[rstest]
    #[actix_web::test]
    async fn non_author_update_is_forbidden() {
        let app = actix_test::init_service(test_app(seeded_store())).await;
        let author = register_user(&app, "author", "a@example.org", "pw").await;
        let other = register_user(&app, "other", "o@example.org", "pw").await;

        let created = create_recipe_as(&app, &author, "Pancakes").await;
        let id = created["id"].as_i64().unwrap();

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::patch()
                .uri(&format!("/api/recipes/{id}/"))
                .cookie(other)
                .set_json(recipe_body("Hijack"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[rstest]
    #[actix_web::test]
    async fn update_replaces_links_wholesale() {
        let store = seeded_store();
        store.seed_ingredient("milk", "ml");
        let app = actix_test::init_service(test_app(store)).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let created = create_recipe_as(&app, &cookie, "Pancakes").await;
        let id = created["id"].as_i64().unwrap();

        let mut body = recipe_body("Pancakes v2");
        body["ingredients"] = json!([{"id": 2, "amount": 500}]);
        body["image"] = Value::Null;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::patch()
                .uri(&format!("/api/recipes/{id}/"))
                .cookie(cookie)
                .set_json(body)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["name"], "Pancakes v2");
        let ingredients = value["ingredients"].as_array().unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0]["name"], "milk");
        // Image untouched when the request omits it.
        assert!(value["image"].as_str().unwrap().starts_with("/media/"));
    }

    #[rstest]
    #[actix_web::test]
    async fn favorite_flow_and_duplicate_rejection() {
        let app = actix_test::init_service(test_app(seeded_store())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;
        let created = create_recipe_as(&app, &cookie, "Pancakes").await;
        let id = created["id"].as_i64().unwrap();

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/recipes/{id}/favorite/"))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["name"], "Pancakes");
        assert!(value.get("text").is_none());

        let duplicate = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/recipes/{id}/favorite/"))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

        let removed = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/recipes/{id}/favorite/"))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(removed.status(), StatusCode::NO_CONTENT);

        let missing = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/recipes/{id}/favorite/"))
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn shopping_list_download_renders_sorted_lines() {
        let store = seeded_store();
        store.seed_ingredient("milk", "ml");
        let app = actix_test::init_service(test_app(store)).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let mut body = recipe_body("Pancakes");
        body["ingredients"] = json!([
            {"id": 1, "amount": 200},
            {"id": 2, "amount": 300},
        ]);
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/recipes/")
                .cookie(cookie.clone())
                .set_json(body)
                .to_request(),
        )
        .await;
        let created: Value = actix_test::read_body_json(response).await;
        let id = created["id"].as_i64().unwrap();

        let mut second = recipe_body("Crepes");
        second["ingredients"] = json!([{"id": 1, "amount": 100}]);
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/recipes/")
                .cookie(cookie.clone())
                .set_json(second)
                .to_request(),
        )
        .await;
        let second_created: Value = actix_test::read_body_json(response).await;
        let second_id = second_created["id"].as_i64().unwrap();

        for recipe in [id, second_id] {
            let response = actix_test::call_service(
                &app,
                actix_test::TestRequest::post()
                    .uri(&format!("/api/recipes/{recipe}/shopping_cart/"))
                    .cookie(cookie.clone())
                    .to_request(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/recipes/download_shopping_cart/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap()
                .to_str()
                .unwrap()
                .contains("attachment")
        );
        let body = actix_test::read_body(response).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert_eq!(text, "flour - 300 (g)\nmilk - 300 (ml)");
    }

    #[rstest]
    #[actix_web::test]
    async fn short_url_redirects() {
        let app = actix_test::init_service(test_app(seeded_store())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;
        let created = create_recipe_as(&app, &cookie, "Pancakes").await;
        let id = created["id"].as_i64().unwrap();

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/recipes/{id}/short-url/"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            &format!("/recipes/{id}")
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn delete_recipe_requires_ownership() {
        let app = actix_test::init_service(test_app(seeded_store())).await;
        let author = register_user(&app, "author", "a@example.org", "pw").await;
        let other = register_user(&app, "other", "o@example.org", "pw").await;
        let created = create_recipe_as(&app, &author, "Pancakes").await;
        let id = created["id"].as_i64().unwrap();

        let forbidden = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/recipes/{id}/"))
                .cookie(other)
                .to_request(),
        )
        .await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let deleted = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/recipes/{id}/"))
                .cookie(author)
                .to_request(),
        )
        .await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let gone = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/recipes/{id}/"))
                .to_request(),
        )
        .await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }
}
