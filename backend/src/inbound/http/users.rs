//! User account handlers: registration, profiles, avatars, and the
//! session login/logout pair.

use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use pagination::{PageRequest, Paginated};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Error;
use crate::domain::auth::{CredentialsError, LoginCredentials, hash_password};
use crate::domain::image::ImageUpload;
use crate::domain::ports::{CreateUserError, MediaCategory};
use crate::domain::user::{Email, NewUser, PersonName, UserId, UserValidationError, Username};
use crate::inbound::http::ApiResult;
use crate::inbound::http::payloads::{UserPayload, media_url};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Maximum accepted password length; matches the name-length cap.
const PASSWORD_MAX: usize = 150;

/// Pagination query parameters shared by list endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct PageParams {
    page: Option<u32>,
    limit: Option<u32>,
}

impl PageParams {
    pub(crate) fn request(&self) -> Result<PageRequest, Error> {
        Self::from_parts(self.page, self.limit)
    }

    pub(crate) fn from_parts(page: Option<u32>, limit: Option<u32>) -> Result<PageRequest, Error> {
        PageRequest::from_params(page, limit).map_err(|error| {
            let field = match error {
                pagination::PageError::ZeroPage => "page",
                pagination::PageError::ZeroLimit => "limit",
            };
            Error::field_validation(field, "out_of_range", error.to_string())
        })
    }
}

/// Whether `viewer` follows `author`; always false for anonymous viewers
/// and for the viewer's own profile.
pub(crate) async fn viewer_subscribed(
    state: &HttpState,
    viewer: Option<UserId>,
    author: UserId,
) -> Result<bool, Error> {
    match viewer {
        Some(viewer) if viewer != author => {
            Ok(state.subscriptions.is_subscribed(viewer, author).await?)
        }
        _ => Ok(false),
    }
}

fn field_code(error: &UserValidationError) -> &'static str {
    match error {
        UserValidationError::EmptyUsername
        | UserValidationError::EmptyEmail
        | UserValidationError::EmptyName => "empty",
        UserValidationError::UsernameTooLong { .. }
        | UserValidationError::EmailTooLong { .. }
        | UserValidationError::NameTooLong { .. } => "too_long",
        UserValidationError::UsernameInvalidCharacters => "invalid_characters",
        UserValidationError::ReservedUsername => "reserved",
        UserValidationError::EmailInvalid => "invalid",
    }
}

fn invalid(field: &'static str, error: &UserValidationError) -> Error {
    Error::field_validation(field, field_code(error), error.to_string())
}

/// Registration request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Register a new account.
#[utoipa::path(
    post,
    path = "/api/users/",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserPayload),
        (status = 400, description = "Validation failure", body = Error),
    ),
    tags = ["users"],
    operation_id = "register",
    security([])
)]
#[post("/users/")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let username = Username::new(body.username).map_err(|e| invalid("username", &e))?;
    let email = Email::new(body.email).map_err(|e| invalid("email", &e))?;
    let first_name = PersonName::new(body.first_name).map_err(|e| invalid("first_name", &e))?;
    let last_name = PersonName::new(body.last_name).map_err(|e| invalid("last_name", &e))?;
    if body.password.is_empty() {
        return Err(Error::field_validation(
            "password",
            "empty",
            "password must not be empty",
        ));
    }
    if body.password.chars().count() > PASSWORD_MAX {
        return Err(Error::field_validation(
            "password",
            "too_long",
            format!("password must be at most {PASSWORD_MAX} characters"),
        ));
    }

    let new_user = NewUser {
        username,
        email,
        first_name,
        last_name,
        password_hash: hash_password(&body.password)?,
    };
    let created = state.users.create(&new_user).await.map_err(|error| match error {
        CreateUserError::DuplicateUsername => {
            Error::field_validation("username", "duplicate", error.to_string())
        }
        CreateUserError::DuplicateEmail => {
            Error::field_validation("email", "duplicate", error.to_string())
        }
        CreateUserError::Repository(repo) => repo.into(),
    })?;
    Ok(HttpResponse::Created().json(UserPayload::new(&created, false)))
}

/// List users, paginated and ordered by username.
#[utoipa::path(
    get,
    path = "/api/users/",
    responses((status = 200, description = "Page of users")),
    tags = ["users"],
    operation_id = "listUsers",
    security([])
)]
#[get("/users/")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<PageParams>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let request = params.request()?;
    let viewer = session.user_id()?;

    let page = state.users.list(request).await?;
    let mut results = Vec::with_capacity(page.items.len());
    for user in &page.items {
        let is_subscribed = viewer_subscribed(&state, viewer, user.id).await?;
        results.push(UserPayload::new(user, is_subscribed));
    }
    let page = pagination::PageOf::new(page.count, results);
    Ok(HttpResponse::Ok().json(Paginated::envelope(
        req.path(),
        req.query_string(),
        &request,
        page,
    )))
}

/// The authenticated user's own profile.
#[utoipa::path(
    get,
    path = "/api/users/me/",
    responses(
        (status = 200, description = "Profile", body = UserPayload),
        (status = 401, description = "Not logged in", body = Error),
    ),
    tags = ["users"],
    operation_id = "me"
)]
#[get("/users/me/")]
pub async fn me(state: web::Data<HttpState>, session: SessionContext) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let user = state
        .users
        .find_by_id(viewer)
        .await?
        .ok_or_else(|| Error::unauthorized("login required"))?;
    Ok(HttpResponse::Ok().json(UserPayload::new(&user, false)))
}

/// Avatar update request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AvatarRequest {
    /// Base64 data URI (`data:image/..;base64,..`).
    pub avatar: String,
}

/// Avatar response body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AvatarResponse {
    pub avatar: String,
}

/// Best-effort removal of a replaced media file; the pointer row is
/// already updated, so failures only leak a file.
async fn discard_media(state: &HttpState, path: Option<String>) {
    if let Some(path) = path
        && let Err(error) = state.media.delete(&path).await
    {
        warn!(%error, path, "failed to remove replaced media file");
    }
}

/// Set the authenticated user's avatar from a base64 data URI.
#[utoipa::path(
    put,
    path = "/api/users/me/avatar/",
    request_body = AvatarRequest,
    responses(
        (status = 200, description = "Avatar stored", body = AvatarResponse),
        (status = 400, description = "Bad image payload", body = Error),
        (status = 401, description = "Not logged in", body = Error),
    ),
    tags = ["users"],
    operation_id = "setAvatar"
)]
#[put("/users/me/avatar/")]
pub async fn set_avatar(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<AvatarRequest>,
) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let upload = ImageUpload::from_data_uri(&payload.avatar)
        .map_err(|error| Error::field_validation("avatar", "invalid_image", error.to_string()))?;

    let stored = state
        .media
        .save(&upload, MediaCategory::Avatars)
        .await
        .map_err(|error| Error::internal(format!("avatar store failed: {error}")))?;
    let previous = state.users.set_avatar(viewer, Some(&stored)).await?;
    discard_media(&state, previous).await;

    Ok(HttpResponse::Ok().json(AvatarResponse {
        avatar: media_url(&stored),
    }))
}

/// Clear the authenticated user's avatar.
#[utoipa::path(
    delete,
    path = "/api/users/me/avatar/",
    responses(
        (status = 204, description = "Avatar cleared"),
        (status = 401, description = "Not logged in", body = Error),
    ),
    tags = ["users"],
    operation_id = "deleteAvatar"
)]
#[delete("/users/me/avatar/")]
pub async fn delete_avatar(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let viewer = session.require_user_id()?;
    let previous = state.users.set_avatar(viewer, None).await?;
    discard_media(&state, previous).await;
    Ok(HttpResponse::NoContent().finish())
}

/// A user's public profile.
#[utoipa::path(
    get,
    path = "/api/users/{id}/",
    responses(
        (status = 200, description = "Profile", body = UserPayload),
        (status = 404, description = "No such user", body = Error),
    ),
    tags = ["users"],
    operation_id = "retrieveUser",
    security([])
)]
#[get("/users/{id}/")]
pub async fn retrieve_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let id = UserId(path.into_inner());
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("user not found"))?;
    let is_subscribed = viewer_subscribed(&state, session.user_id()?, id).await?;
    Ok(HttpResponse::Ok().json(UserPayload::new(&user, is_subscribed)))
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn map_credentials_error(error: CredentialsError) -> Error {
    match error {
        CredentialsError::EmptyEmail => {
            Error::field_validation("email", "empty", error.to_string())
        }
        CredentialsError::EmptyPassword => {
            Error::field_validation("password", "empty", error.to_string())
        }
    }
}

/// Authenticate by email and password and establish a session.
#[utoipa::path(
    post,
    path = "/api/auth/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established"),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login/")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = LoginCredentials::new(&payload.email, &payload.password)
        .map_err(map_credentials_error)?;
    let user = state.login.authenticate(&credentials).await?;
    session.persist_user(user.id)?;
    Ok(HttpResponse::Ok().finish())
}

/// Drop the current session.
#[utoipa::path(
    post,
    path = "/api/auth/logout/",
    responses((status = 204, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout/")]
pub async fn logout(session: SessionContext) -> ApiResult<HttpResponse> {
    session.clear();
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{register_user, test_app};
    use crate::outbound::InMemoryStore;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[actix_web::test]
    async fn register_returns_created_profile() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let request = actix_test::TestRequest::post()
            .uri("/api/users/")
            .set_json(json!({
                "email": "ada@example.org",
                "username": "ada",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "password": "correct horse",
            }))
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["username"], "ada");
        assert_eq!(value["is_subscribed"], false);
        assert!(value["avatar"].is_null());
        assert!(value.get("password").is_none());
    }

    #[rstest]
    #[case(json!({"email": "a@b.co", "username": "me", "first_name": "A", "last_name": "B", "password": "x"}), "username", "reserved")]
    #[case(json!({"email": "a@b.co", "username": "has space", "first_name": "A", "last_name": "B", "password": "x"}), "username", "invalid_characters")]
    #[case(json!({"email": "nodot", "username": "fine", "first_name": "A", "last_name": "B", "password": "x"}), "email", "invalid")]
    #[case(json!({"email": "a@b.co", "username": "fine", "first_name": "A", "last_name": "B", "password": ""}), "password", "empty")]
    #[actix_web::test]
    async fn register_rejects_invalid_fields(
        #[case] body: Value,
        #[case] field: &str,
        #[case] code: &str,
    ) {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let request = actix_test::TestRequest::post()
            .uri("/api/users/")
            .set_json(body)
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["code"], "invalid_request");
        assert_eq!(value["details"]["field"], field);
        assert_eq!(value["details"]["code"], code);
    }

    #[rstest]
    #[actix_web::test]
    async fn duplicate_email_is_a_field_error() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        register_user(&app, "ada", "ada@example.org", "pw").await;

        let request = actix_test::TestRequest::post()
            .uri("/api/users/")
            .set_json(json!({
                "email": "ada@example.org",
                "username": "grace",
                "first_name": "Grace",
                "last_name": "Hopper",
                "password": "pw",
            }))
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["details"]["field"], "email");
        assert_eq!(value["details"]["code"], "duplicate");
    }

    #[rstest]
    #[actix_web::test]
    async fn login_then_me_round_trips() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        register_user(&app, "ada", "ada@example.org", "pw").await;

        let login_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/auth/login/")
                .set_json(json!({"email": "ada@example.org", "password": "pw"}))
                .to_request(),
        )
        .await;
        assert_eq!(login_res.status(), StatusCode::OK);
        let cookie = login_res
            .response()
            .cookies()
            .find(|c| c.name() == "session")
            .expect("session cookie");

        let me_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/users/me/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(me_res.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(me_res).await;
        assert_eq!(value["email"], "ada@example.org");
    }

    #[rstest]
    #[actix_web::test]
    async fn wrong_password_is_unauthorised() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        register_user(&app, "ada", "ada@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/auth/login/")
                .set_json(json!({"email": "ada@example.org", "password": "nope"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["code"], "unauthorized");
        assert_eq!(value["message"], "invalid credentials");
    }

    #[rstest]
    #[actix_web::test]
    async fn me_requires_session() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/users/me/")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[actix_web::test]
    async fn retrieve_unknown_user_is_not_found() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/users/99/")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn user_list_paginates_with_envelope() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        for name in ["ada", "grace", "joan"] {
            register_user(&app, name, &format!("{name}@example.org"), "pw").await;
        }

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/users/?page=1&limit=2")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["count"], 3);
        assert_eq!(value["results"].as_array().unwrap().len(), 2);
        assert!(value["next"].as_str().unwrap().contains("page=2"));
        assert!(value["previous"].is_null());
        // Ordered by username.
        assert_eq!(value["results"][0]["username"], "ada");
    }

    #[rstest]
    #[actix_web::test]
    async fn avatar_round_trip() {
        const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk\
YPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let put_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri("/api/users/me/avatar/")
                .cookie(cookie.clone())
                .set_json(json!({"avatar": format!("data:image/png;base64,{PNG_B64}")}))
                .to_request(),
        )
        .await;
        assert_eq!(put_res.status(), StatusCode::OK);
        let value: Value = actix_test::read_body_json(put_res).await;
        let avatar = value["avatar"].as_str().unwrap();
        assert!(avatar.starts_with("/media/avatars/"));
        assert!(avatar.ends_with(".png"));

        let delete_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri("/api/users/me/avatar/")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(delete_res.status(), StatusCode::NO_CONTENT);

        let me_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/users/me/")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let value: Value = actix_test::read_body_json(me_res).await;
        assert!(value["avatar"].is_null());
    }

    #[rstest]
    #[actix_web::test]
    async fn bad_avatar_payload_is_field_error() {
        let app = actix_test::init_service(test_app(InMemoryStore::new())).await;
        let cookie = register_user(&app, "ada", "ada@example.org", "pw").await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri("/api/users/me/avatar/")
                .cookie(cookie)
                .set_json(json!({"avatar": "not a data uri"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["details"]["field"], "avatar");
    }
}
