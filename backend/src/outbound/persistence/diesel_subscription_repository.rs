//! PostgreSQL-backed [`SubscriptionRepository`] implementation using Diesel.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::{PageOf, PageRequest};

use crate::domain::ports::{
    AuthorProfile, RepositoryError, SubscribeError, SubscriptionRepository,
};
use crate::domain::user::UserId;

use super::error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{NewSubscriptionRow, UserRow};
use super::pool::DbPool;
use super::schema::{recipes, subscriptions, users};

/// Diesel-backed implementation of the [`SubscriptionRepository`] port.
#[derive(Clone)]
pub struct DieselSubscriptionRepository {
    pool: DbPool,
}

impl DieselSubscriptionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Recipe counts per author for the given author ids.
async fn recipe_counts(
    conn: &mut diesel_async::AsyncPgConnection,
    author_ids: &[i32],
) -> Result<HashMap<i32, i64>, RepositoryError> {
    let counts: Vec<(i32, i64)> = recipes::table
        .filter(recipes::author_id.eq_any(author_ids))
        .group_by(recipes::author_id)
        .select((recipes::author_id, count_star()))
        .load(conn)
        .await
        .map_err(map_diesel_error)?;
    Ok(counts.into_iter().collect())
}

fn row_to_profile(row: UserRow, recipes_count: i64) -> Result<AuthorProfile, RepositoryError> {
    let user = row
        .into_user()
        .map_err(|error| RepositoryError::query(error.message().to_owned()))?;
    Ok(AuthorProfile {
        user,
        recipes_count,
    })
}

#[async_trait]
impl SubscriptionRepository for DieselSubscriptionRepository {
    async fn subscribe(&self, follower: UserId, author: UserId) -> Result<(), SubscribeError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewSubscriptionRow {
            follower_id: follower.0,
            author_id: author.0,
        };
        diesel::insert_into(subscriptions::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|error| {
                if is_unique_violation(&error, None) {
                    SubscribeError::AlreadySubscribed
                } else {
                    SubscribeError::Repository(map_diesel_error(error))
                }
            })?;
        Ok(())
    }

    async fn unsubscribe(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(
            subscriptions::table
                .filter(subscriptions::follower_id.eq(follower.0))
                .filter(subscriptions::author_id.eq(author.0)),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn is_subscribed(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let found: i64 = subscriptions::table
            .filter(subscriptions::follower_id.eq(follower.0))
            .filter(subscriptions::author_id.eq(author.0))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(found > 0)
    }

    async fn list_authors(
        &self,
        follower: UserId,
        page: PageRequest,
    ) -> Result<PageOf<AuthorProfile>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = subscriptions::table
            .filter(subscriptions::follower_id.eq(follower.0))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let rows: Vec<UserRow> = subscriptions::table
            .inner_join(users::table.on(users::id.eq(subscriptions::author_id)))
            .filter(subscriptions::follower_id.eq(follower.0))
            .order_by(users::username)
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let author_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let counts = recipe_counts(&mut conn, &author_ids).await?;

        let items = rows
            .into_iter()
            .map(|row| {
                let recipes_count = counts.get(&row.id).copied().unwrap_or(0);
                row_to_profile(row, recipes_count)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageOf::new(count.unsigned_abs(), items))
    }

    async fn author_profile(
        &self,
        author: UserId,
    ) -> Result<Option<AuthorProfile>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .find(author.0)
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let recipes_count: i64 = recipes::table
            .filter(recipes::author_id.eq(author.0))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(Some(row_to_profile(row, recipes_count)?))
    }
}
