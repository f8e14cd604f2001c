//! PostgreSQL-backed [`UserRepository`] implementation using Diesel.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::{PageOf, PageRequest};

use crate::domain::ports::{CreateUserError, RepositoryError, UserRepository};
use crate::domain::user::{NewUser, User, UserId};

use super::error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{NewUserRow, UserRow};
use super::pool::DbPool;
use super::schema::users;

/// Constraint names from the users migration; used to tell apart the two
/// duplicate-registration cases.
const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Diesel-backed implementation of the [`UserRepository`] port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: UserRow) -> Result<User, RepositoryError> {
    row.into_user()
        .map_err(|error| RepositoryError::query(error.message().to_owned()))
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, CreateUserError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewUserRow {
            username: user.username.as_ref(),
            email: user.email.as_ref(),
            first_name: user.first_name.as_ref(),
            last_name: user.last_name.as_ref(),
            password_hash: &user.password_hash,
        };
        let inserted: UserRow = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|error| {
                if is_unique_violation(&error, Some(USERNAME_CONSTRAINT)) {
                    CreateUserError::DuplicateUsername
                } else if is_unique_violation(&error, Some(EMAIL_CONSTRAINT)) {
                    CreateUserError::DuplicateEmail
                } else {
                    CreateUserError::Repository(map_diesel_error(error))
                }
            })?;
        Ok(row_to_user(inserted)?)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .find(id.0)
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_email_with_hash(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| {
            let hash = row.password_hash.clone();
            row_to_user(row).map(|user| (user, hash))
        })
        .transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<PageOf<User>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = users::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let rows: Vec<UserRow> = users::table
            .order_by(users::username)
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let items = rows
            .into_iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageOf::new(count.unsigned_abs(), items))
    }

    async fn set_avatar(
        &self,
        id: UserId,
        avatar: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let previous: Option<String> = users::table
            .find(id.0)
            .select(users::avatar)
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        diesel::update(users::table.find(id.0))
            .set(users::avatar.eq(avatar))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(previous)
    }
}
