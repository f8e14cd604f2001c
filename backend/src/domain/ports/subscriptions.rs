//! Port for the directed follow relationship between users.

use async_trait::async_trait;
use pagination::{PageOf, PageRequest};

use crate::domain::user::{User, UserId};

use super::RepositoryError;

/// A followed author annotated with their recipe count.
///
/// The capped recipe list of the subscription payload is fetched
/// separately through the recipe port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorProfile {
    pub user: User,
    pub recipes_count: i64,
}

/// Failures raised while creating a subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    /// The follower already follows this author.
    ///
    /// The unique `(follower, author)` constraint reports concurrent
    /// duplicate follows through this variant as well.
    #[error("already subscribed to this user")]
    AlreadySubscribed,
    /// Infrastructure failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Port for subscription storage.
///
/// The self-subscription rule is enforced before this port is reached;
/// the database check constraint is the backstop, not the primary gate.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Record that `follower` follows `author`.
    async fn subscribe(&self, follower: UserId, author: UserId) -> Result<(), SubscribeError>;

    /// Delete the follow edge; returns whether one existed.
    async fn unsubscribe(&self, follower: UserId, author: UserId)
    -> Result<bool, RepositoryError>;

    /// Whether `follower` currently follows `author`.
    async fn is_subscribed(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<bool, RepositoryError>;

    /// Followed authors with recipe counts, ordered by username.
    async fn list_authors(
        &self,
        follower: UserId,
        page: PageRequest,
    ) -> Result<PageOf<AuthorProfile>, RepositoryError>;

    /// A single author annotated with their recipe count.
    async fn author_profile(
        &self,
        author: UserId,
    ) -> Result<Option<AuthorProfile>, RepositoryError>;
}
