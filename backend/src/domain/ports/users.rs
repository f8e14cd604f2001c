//! Port for user account storage.

use async_trait::async_trait;
use pagination::{PageOf, PageRequest};

use crate::domain::user::{NewUser, User, UserId};

use super::RepositoryError;

/// Failures raised while registering a user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateUserError {
    /// Another account already uses this username.
    #[error("a user with this username already exists")]
    DuplicateUsername,
    /// Another account already uses this email.
    #[error("a user with this email already exists")]
    DuplicateEmail,
    /// Infrastructure failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Port for user account storage and retrieval.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a validated registration.
    ///
    /// Unique constraints on username and email arbitrate concurrent
    /// registrations; the loser receives the matching duplicate error.
    async fn create(&self, user: &NewUser) -> Result<User, CreateUserError>;

    /// Fetch a user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch a user and their password hash by login email.
    async fn find_by_email_with_hash(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// List users ordered by username.
    async fn list(&self, page: PageRequest) -> Result<PageOf<User>, RepositoryError>;

    /// Replace the stored avatar path, returning the previous one.
    ///
    /// Passing `None` clears the avatar.
    async fn set_avatar(
        &self,
        id: UserId,
        avatar: Option<&str>,
    ) -> Result<Option<String>, RepositoryError>;
}
