//! Backend entry-point: wires REST endpoints, media serving, and OpenAPI docs.

mod server;

use std::env;

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use backend::outbound::persistence::{DbPool, PoolConfig};
use server::{ServerConfig, create_server, run_migrations};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let mut config = ServerConfig::from_env()?;
    if let Ok(database_url) = env::var("DATABASE_URL") {
        run_migrations(&database_url).await?;
        let pool = DbPool::new(PoolConfig::new(database_url))
            .await
            .map_err(|e| std::io::Error::other(format!("pool construction failed: {e}")))?;
        config = config.with_db_pool(pool);
    }

    create_server(config)?.await
}
