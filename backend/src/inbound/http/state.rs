//! Shared application state for HTTP handlers.

use std::sync::Arc;

use crate::domain::auth::PasswordLoginService;
use crate::domain::ports::{
    CatalogueRepository, LoginService, MarksRepository, MediaStore, RecipeRepository,
    SubscriptionRepository, UserRepository,
};
use crate::outbound::persistence::{
    DbPool, DieselCatalogueRepository, DieselMarksRepository, DieselRecipeRepository,
    DieselSubscriptionRepository, DieselUserRepository,
};
use crate::outbound::{FsMediaStore, InMemoryStore};

/// Port handles the handlers resolve their dependencies through.
///
/// Every field is a trait object so the same handler set runs against
/// the Diesel adapters in production and the in-memory store in tests.
#[derive(Clone)]
pub struct HttpState {
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub catalogue: Arc<dyn CatalogueRepository>,
    pub recipes: Arc<dyn RecipeRepository>,
    pub marks: Arc<dyn MarksRepository>,
    pub media: Arc<dyn MediaStore>,
    pub login: Arc<dyn LoginService>,
}

impl HttpState {
    /// Wire every port to the shared in-memory store.
    ///
    /// Used by handler tests and the database-less development mode.
    pub fn in_memory(store: InMemoryStore) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(store.clone());
        Self {
            login: Arc::new(PasswordLoginService::new(Arc::clone(&users))),
            users,
            subscriptions: Arc::new(store.clone()),
            catalogue: Arc::new(store.clone()),
            recipes: Arc::new(store.clone()),
            marks: Arc::new(store.clone()),
            media: Arc::new(store),
        }
    }

    /// Wire every port to the Diesel adapters over the given pool, with
    /// media files on the local filesystem.
    pub fn diesel(pool: DbPool, media: FsMediaStore) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(DieselUserRepository::new(pool.clone()));
        Self {
            login: Arc::new(PasswordLoginService::new(Arc::clone(&users))),
            users,
            subscriptions: Arc::new(DieselSubscriptionRepository::new(pool.clone())),
            catalogue: Arc::new(DieselCatalogueRepository::new(pool.clone())),
            recipes: Arc::new(DieselRecipeRepository::new(pool.clone())),
            marks: Arc::new(DieselMarksRepository::new(pool)),
            media: Arc::new(media),
        }
    }
}
