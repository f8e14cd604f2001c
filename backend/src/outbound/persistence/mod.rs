//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the domain repository ports backed by
//! PostgreSQL via `diesel-async` with `bb8` connection pooling.
//!
//! The adapters are thin: they translate between Diesel row structs and
//! domain types and map database failures into port errors. Business
//! rules live in the domain; the unique constraints here only arbitrate
//! races the domain cannot see.

mod diesel_catalogue_repository;
mod diesel_marks_repository;
mod diesel_recipe_repository;
mod diesel_subscription_repository;
mod diesel_user_repository;
mod error_mapping;
mod models;
mod pool;
mod schema;

pub use diesel_catalogue_repository::DieselCatalogueRepository;
pub use diesel_marks_repository::DieselMarksRepository;
pub use diesel_recipe_repository::DieselRecipeRepository;
pub use diesel_subscription_repository::DieselSubscriptionRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, PoolConfig, PoolError};

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations compiled into the binary; applied at startup.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
