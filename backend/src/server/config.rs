//! HTTP server configuration object and helpers.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::cookie::{Key, SameSite};
use tracing::warn;

use backend::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) media_root: PathBuf,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    /// Construct a server configuration using application preferences.
    #[must_use]
    pub fn new(
        key: Key,
        cookie_secure: bool,
        same_site: SameSite,
        bind_addr: SocketAddr,
        media_root: PathBuf,
    ) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            media_root,
            db_pool: None,
        }
    }

    /// Build the configuration from the environment.
    ///
    /// - `BIND_ADDR`: listen address, default `0.0.0.0:8080`.
    /// - `MEDIA_ROOT`: media file directory, default `media`.
    /// - `SESSION_KEY_FILE`: path to the session key material.
    /// - `SESSION_COOKIE_SECURE`: any value other than `0` keeps the
    ///   `Secure` flag on (the default).
    /// - `SESSION_ALLOW_EPHEMERAL=1`: permit a generated key outside
    ///   debug builds when the key file is unreadable.
    pub fn from_env() -> std::io::Result<Self> {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".into())
            .parse::<SocketAddr>()
            .map_err(|e| std::io::Error::other(format!("invalid BIND_ADDR: {e}")))?;
        let media_root = PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".into()));

        let key_path =
            env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
        let key = match std::fs::read(&key_path) {
            Ok(bytes) => Key::derive_from(&bytes),
            Err(e) => {
                let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
                if cfg!(debug_assertions) || allow_dev {
                    warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                    Key::generate()
                } else {
                    return Err(std::io::Error::other(format!(
                        "failed to read session key at {key_path}: {e}"
                    )));
                }
            }
        };

        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .map(|v| v != "0")
            .unwrap_or(true);

        Ok(Self::new(
            key,
            cookie_secure,
            SameSite::Lax,
            bind_addr,
            media_root,
        ))
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// When provided, the server uses the Diesel-backed repositories;
    /// otherwise it falls back to the in-memory store.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}
