//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, get, web};
use std::path::{Component, Path, PathBuf};

#[cfg(debug_assertions)]
use backend::doc::ApiDoc;
use backend::inbound::http::routes;
use backend::inbound::http::state::HttpState;
use backend::middleware::RequestTracking;
use backend::outbound::{FsMediaStore, InMemoryStore};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Apply pending embedded migrations over a blocking connection.
///
/// The migration harness is synchronous, so it runs on the blocking
/// thread pool before the async pool is built.
pub async fn run_migrations(database_url: &str) -> std::io::Result<()> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        use diesel::Connection;
        use diesel_migrations::MigrationHarness;

        let mut conn = diesel::PgConnection::establish(&url)
            .map_err(|e| std::io::Error::other(format!("database connection failed: {e}")))?;
        conn.run_pending_migrations(backend::outbound::persistence::MIGRATIONS)
            .map_err(|e| std::io::Error::other(format!("running migrations failed: {e}")))?;
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::other(format!("migration task panicked: {e}")))?
}

/// Media root shared with the static file handler.
#[derive(Clone)]
struct MediaRoot(PathBuf);

fn media_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        Some("jpeg" | "jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Serve stored media files relative to the media root.
///
/// Only plain relative paths are accepted; anything with a parent or
/// root component is treated as missing.
#[get("/media/{path:.*}")]
async fn serve_media(root: web::Data<MediaRoot>, path: web::Path<String>) -> HttpResponse {
    let relative = PathBuf::from(path.into_inner());
    if relative
        .components()
        .any(|part| !matches!(part, Component::Normal(_)))
    {
        return HttpResponse::NotFound().finish();
    }

    let full = root.0.join(&relative);
    match tokio::fs::read(&full).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(media_content_type(&relative))
            .body(bytes),
        Err(_) => HttpResponse::NotFound().finish(),
    }
}

#[derive(Clone)]
struct AppDependencies {
    http_state: web::Data<HttpState>,
    media_root: MediaRoot,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        http_state,
        media_root,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let app = App::new()
        .app_data(http_state)
        .app_data(web::Data::new(media_root))
        .wrap(session)
        .wrap(RequestTracking)
        .configure(routes::configure)
        .service(serve_media);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server from the given configuration.
///
/// Uses the Diesel adapters when a pool is configured and the in-memory
/// store otherwise, so the server also runs database-less for local
/// development.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(config: ServerConfig) -> std::io::Result<Server> {
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        media_root,
        db_pool,
    } = config;

    let http_state = match db_pool {
        Some(pool) => HttpState::diesel(pool, FsMediaStore::new(media_root.clone())),
        None => {
            tracing::warn!("no database configured; using the in-memory store");
            HttpState::in_memory(InMemoryStore::new())
        }
    };
    let http_state = web::Data::new(http_state);
    let media_root = MediaRoot(media_root);

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            http_state: http_state.clone(),
            media_root: media_root.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("avatars/a.png", "image/png")]
    #[case("recipes/images/b.jpeg", "image/jpeg")]
    #[case("recipes/images/c.webp", "image/webp")]
    #[case("notes.txt", "application/octet-stream")]
    fn content_type_follows_extension(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(media_content_type(Path::new(path)), expected);
    }

    #[rstest]
    #[actix_web::test]
    async fn media_handler_rejects_traversal() {
        let app = actix_web::test::init_service(
            App::new()
                .app_data(web::Data::new(MediaRoot(std::env::temp_dir())))
                .service(serve_media),
        )
        .await;
        let response = actix_web::test::call_service(
            &app,
            actix_web::test::TestRequest::get()
                .uri("/media/../etc/passwd")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
