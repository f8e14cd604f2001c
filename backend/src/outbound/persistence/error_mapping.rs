//! Shared Diesel and pool error mapping for the persistence adapters.

use tracing::debug;

use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

/// Map pool failures to the shared repository connection error.
pub(super) fn map_pool_error(error: PoolError) -> RepositoryError {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    RepositoryError::connection(message)
}

/// Map Diesel failures to the shared repository error, logging the
/// underlying cause at debug level so wire responses stay generic.
pub(super) fn map_diesel_error(error: diesel::result::Error) -> RepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => RepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => RepositoryError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RepositoryError::connection("database connection error")
        }
        _ => RepositoryError::query("database error"),
    }
}

/// Whether the error is a unique-constraint violation, optionally on a
/// specific named constraint.
///
/// Adapters use this to turn the insert race on `(user, recipe)` and
/// `(follower, author)` pairs into their duplicate variants instead of a
/// generic query failure.
pub(super) fn is_unique_violation(
    error: &diesel::result::Error,
    constraint: Option<&str>,
) -> bool {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => match constraint {
            Some(name) => info.constraint_name() == Some(name),
            None => true,
        },
        _ => false,
    }
}
