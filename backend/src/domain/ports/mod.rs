//! Domain ports: traits the inbound adapters depend on and the outbound
//! adapters implement.
//!
//! Each port gets its own error enum so handlers can map failures to the
//! right HTTP status without inspecting adapter internals. The shared
//! [`RepositoryError`] covers infrastructure failures common to every
//! persistence port.

mod catalogue;
mod login;
mod marks;
mod media;
mod recipes;
mod subscriptions;
mod users;

pub use catalogue::CatalogueRepository;
pub use login::LoginService;
pub use marks::{MarkError, MarksRepository};
pub use media::{MediaCategory, MediaError, MediaStore};
pub use recipes::{RecipeListFilter, RecipeRepository, RecipeWithFlags, RecipeWriteError};
pub use subscriptions::{AuthorProfile, SubscribeError, SubscriptionRepository};
pub use users::{CreateUserError, UserRepository};

use crate::domain::Error;

/// Infrastructure failures shared by all persistence ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// The backing store could not be reached.
    #[error("repository connection failed: {message}")]
    Connection { message: String },
    /// A query or mutation failed during execution.
    #[error("repository query failed: {message}")]
    Query { message: String },
}

impl RepositoryError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

impl From<RepositoryError> for Error {
    fn from(error: RepositoryError) -> Self {
        tracing::error!(%error, "repository failure");
        Error::internal("storage failure")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;

    #[test]
    fn repository_errors_map_to_internal() {
        let error: Error = RepositoryError::query("boom").into();
        assert_eq!(error.code(), ErrorCode::InternalError);
    }
}
