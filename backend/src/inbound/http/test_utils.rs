//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::{App, test as actix_test, web};
use serde_json::json;

use crate::inbound::http::routes;
use crate::inbound::http::state::HttpState;
use crate::outbound::InMemoryStore;

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Build the full application over an in-memory store.
pub fn test_app(
    store: InMemoryStore,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(HttpState::in_memory(store)))
        .wrap(test_session_middleware())
        .configure(routes::configure)
}

/// A store pre-seeded with one tag and one ingredient, ids 1 and 1.
pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.seed_tag("Breakfast", "breakfast");
    store.seed_ingredient("flour", "g");
    store
}

/// Register an account and log it in; returns the session cookie.
pub async fn register_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    username: &str,
    email: &str,
    password: &str,
) -> Cookie<'static> {
    let register = actix_test::call_service(
        app,
        actix_test::TestRequest::post()
            .uri("/api/users/")
            .set_json(json!({
                "email": email,
                "username": username,
                "first_name": "Test",
                "last_name": "User",
                "password": password,
            }))
            .to_request(),
    )
    .await;
    assert!(register.status().is_success(), "registration failed");

    let login = actix_test::call_service(
        app,
        actix_test::TestRequest::post()
            .uri("/api/auth/login/")
            .set_json(json!({"email": email, "password": password}))
            .to_request(),
    )
    .await;
    assert!(login.status().is_success(), "login failed");
    login
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}
