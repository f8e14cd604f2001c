//! Port for credential verification.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::auth::LoginCredentials;
use crate::domain::user::User;

/// Port for turning credentials into an authenticated user.
///
/// Returns [`Error::unauthorized`] for unknown emails and wrong
/// passwords alike; callers cannot distinguish the two.
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Verify credentials and return the matching user.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error>;
}
