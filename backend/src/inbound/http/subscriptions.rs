//! Subscription handlers: follow and unfollow authors, list followed
//! authors with their recipe previews.

use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use pagination::{DEFAULT_PAGE_SIZE, PageOf, Paginated};
use serde::Deserialize;

use crate::domain::Error;
use crate::domain::ports::SubscribeError;
use crate::domain::user::UserId;
use crate::inbound::http::ApiResult;
use crate::inbound::http::payloads::SubscribedAuthorPayload;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::PageParams;

/// Query parameters for subscription payloads.
#[derive(Debug, Deserialize)]
pub struct SubscriptionParams {
    /// Cap on the embedded recipe previews per author.
    recipes_limit: Option<u32>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl SubscriptionParams {
    fn recipes_limit(&self) -> u32 {
        self.recipes_limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Follow an author.
#[utoipa::path(
    post,
    path = "/api/users/{id}/subscribe/",
    params(("id" = i32, Path, description = "Author id")),
    responses(
        (status = 201, description = "Subscribed", body = SubscribedAuthorPayload),
        (status = 400, description = "Self-subscription or duplicate", body = Error),
        (status = 401, description = "Not logged in", body = Error),
        (status = 404, description = "No such user", body = Error),
    ),
    tags = ["subscriptions"],
    operation_id = "subscribe"
)]
#[post("/users/{id}/subscribe/")]
pub async fn subscribe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
    params: web::Query<SubscriptionParams>,
) -> ApiResult<HttpResponse> {
    let follower = session.require_user_id()?;
    let author = UserId(path.into_inner());

    if follower == author {
        return Err(Error::invalid_request("cannot subscribe to yourself"));
    }
    let profile = state
        .subscriptions
        .author_profile(author)
        .await?
        .ok_or_else(|| Error::not_found("user not found"))?;

    state
        .subscriptions
        .subscribe(follower, author)
        .await
        .map_err(|error| match error {
            SubscribeError::AlreadySubscribed => Error::invalid_request(error.to_string()),
            SubscribeError::Repository(repo) => repo.into(),
        })?;

    let recipes = state
        .recipes
        .summaries_by_author(author, params.recipes_limit())
        .await?;
    Ok(HttpResponse::Created().json(SubscribedAuthorPayload::new(&profile, &recipes)))
}

/// Unfollow an author.
#[utoipa::path(
    delete,
    path = "/api/users/{id}/subscribe/",
    params(("id" = i32, Path, description = "Author id")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 401, description = "Not logged in", body = Error),
        (status = 404, description = "Not subscribed", body = Error),
    ),
    tags = ["subscriptions"],
    operation_id = "unsubscribe"
)]
#[delete("/users/{id}/subscribe/")]
pub async fn unsubscribe(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let follower = session.require_user_id()?;
    let author = UserId(path.into_inner());

    if !state.subscriptions.unsubscribe(follower, author).await? {
        return Err(Error::not_found("not subscribed to this user"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Followed authors with recipe previews, paginated.
#[utoipa::path(
    get,
    path = "/api/users/subscriptions/",
    responses(
        (status = 200, description = "Page of followed authors"),
        (status = 401, description = "Not logged in", body = Error),
    ),
    tags = ["subscriptions"],
    operation_id = "listSubscriptions"
)]
#[get("/users/subscriptions/")]
pub async fn list_subscriptions(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<SubscriptionParams>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let follower = session.require_user_id()?;
    let request = PageParams::from_parts(params.page, params.limit)?;

    let page = state.subscriptions.list_authors(follower, request).await?;
    let mut results = Vec::with_capacity(page.items.len());
    for profile in &page.items {
        let recipes = state
            .recipes
            .summaries_by_author(profile.user.id, params.recipes_limit())
            .await?;
        results.push(SubscribedAuthorPayload::new(profile, &recipes));
    }
    let page = PageOf::new(page.count, results);
    Ok(HttpResponse::Ok().json(Paginated::envelope(
        req.path(),
        req.query_string(),
        &request,
        page,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{register_user, test_app};
    use crate::outbound::InMemoryStore;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[actix_web::test]
    async fn subscribe_and_list_round_trip() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let follower = register_user(&app, "follower", "f@example.org", "pw").await;
        register_user(&app, "author", "a@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/users/2/subscribe/")
                .cookie(follower.clone())
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["username"], "author");
        assert_eq!(value["is_subscribed"], true);
        assert_eq!(value["recipes_count"], 0);

        let list = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/users/subscriptions/")
                .cookie(follower)
                .to_request(),
        )
        .await;
        assert_eq!(list.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(list).await;
        assert_eq!(value["count"], 1);
        assert_eq!(value["results"][0]["username"], "author");
    }

    #[rstest]
    #[actix_web::test]
    async fn self_subscription_is_rejected() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/users/1/subscribe/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["message"], "cannot subscribe to yourself");
    }

    #[rstest]
    #[actix_web::test]
    async fn duplicate_subscription_is_rejected() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let follower = register_user(&app, "follower", "f@example.org", "pw").await;
        register_user(&app, "author", "a@example.org", "pw").await;

        for expected in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
            let response = actix_test::call_service(
                &app,
                actix_test::TestRequest::post()
                    .uri("/api/users/2/subscribe/")
                    .cookie(follower.clone())
                    .to_request(),
            )
            .await;
            assert_eq!(response.status(), expected);
        }
    }

    #[rstest]
    #[actix_web::test]
    async fn subscribing_to_unknown_user_is_not_found() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/users/99/subscribe/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn unsubscribe_without_subscription_is_not_found() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;
        register_user(&app, "author", "a@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri("/api/users/2/subscribe/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
