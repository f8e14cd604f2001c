//! PostgreSQL-backed [`RecipeRepository`] implementation using Diesel.
//!
//! Writes run in a single transaction covering the recipe row and its
//! ingredient and tag links, so referenced-id failures leave no partial
//! rows behind. Reads batch-load links and authors to keep list pages at
//! a fixed number of queries regardless of page size.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use pagination::{PageOf, PageRequest};

use crate::domain::catalogue::{Ingredient, IngredientId, Tag, TagId};
use crate::domain::ports::{
    RecipeListFilter, RecipeRepository, RecipeWithFlags, RecipeWriteError, RepositoryError,
};
use crate::domain::recipe::{RecipeDraft, RecipeId, RecipeRecord, RecipeSummary, ViewerFlags};
use crate::domain::user::{User, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    IngredientRow, NewRecipeIngredientRow, NewRecipeRow, NewRecipeTagRow, RecipeRow, TagRow,
    UserRow,
};
use super::pool::DbPool;
use super::schema::{
    favorites, ingredients, recipe_ingredients, recipe_tags, recipes, shopping_cart_items, tags,
    users,
};

/// Diesel-backed implementation of the [`RecipeRepository`] port.
#[derive(Clone)]
pub struct DieselRecipeRepository {
    pool: DbPool,
}

impl DieselRecipeRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Internal error carried through write transactions; lets domain-level
/// write failures abort the transaction alongside raw Diesel errors.
#[derive(Debug)]
enum TxError {
    Write(RecipeWriteError),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<TxError> for RecipeWriteError {
    fn from(error: TxError) -> Self {
        match error {
            TxError::Write(write) => write,
            TxError::Diesel(diesel) => Self::Repository(map_diesel_error(diesel)),
        }
    }
}

impl From<TxError> for RepositoryError {
    fn from(error: TxError) -> Self {
        match error {
            TxError::Write(RecipeWriteError::Repository(repo)) => repo,
            TxError::Write(write) => Self::query(write.to_string()),
            TxError::Diesel(diesel) => map_diesel_error(diesel),
        }
    }
}

fn invalid_row(message: impl Into<String>) -> TxError {
    TxError::Write(RecipeWriteError::Repository(RepositoryError::query(
        message.into(),
    )))
}

fn amount_to_db(amount: u32) -> i32 {
    // Draft validation bounds amounts well below i32::MAX.
    i32::try_from(amount).unwrap_or(i32::MAX)
}

fn cooking_time_to_db(minutes: u32) -> i32 {
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

/// Verify every referenced ingredient and tag id exists.
async fn check_references(
    conn: &mut AsyncPgConnection,
    draft: &RecipeDraft,
) -> Result<(), TxError> {
    let wanted_ingredients: Vec<i32> = draft
        .ingredients()
        .iter()
        .map(|entry| entry.ingredient.0)
        .collect();
    let known: HashSet<i32> = ingredients::table
        .filter(ingredients::id.eq_any(&wanted_ingredients))
        .select(ingredients::id)
        .load::<i32>(conn)
        .await?
        .into_iter()
        .collect();
    let mut missing: Vec<IngredientId> = wanted_ingredients
        .iter()
        .filter(|id| !known.contains(id))
        .map(|id| IngredientId(*id))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(TxError::Write(RecipeWriteError::UnknownIngredients(
            missing,
        )));
    }

    let wanted_tags: Vec<i32> = draft.tags().iter().map(|tag| tag.0).collect();
    let known: HashSet<i32> = tags::table
        .filter(tags::id.eq_any(&wanted_tags))
        .select(tags::id)
        .load::<i32>(conn)
        .await?
        .into_iter()
        .collect();
    let mut missing: Vec<TagId> = wanted_tags
        .iter()
        .filter(|id| !known.contains(id))
        .map(|id| TagId(*id))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(TxError::Write(RecipeWriteError::UnknownTags(missing)));
    }
    Ok(())
}

/// Insert the ingredient and tag link rows for a recipe.
async fn insert_links(
    conn: &mut AsyncPgConnection,
    recipe_id: i32,
    draft: &RecipeDraft,
) -> Result<(), TxError> {
    let ingredient_rows: Vec<NewRecipeIngredientRow> = draft
        .ingredients()
        .iter()
        .map(|entry| NewRecipeIngredientRow {
            recipe_id,
            ingredient_id: entry.ingredient.0,
            amount: amount_to_db(entry.amount),
        })
        .collect();
    diesel::insert_into(recipe_ingredients::table)
        .values(&ingredient_rows)
        .execute(conn)
        .await?;

    let tag_rows: Vec<NewRecipeTagRow> = draft
        .tags()
        .iter()
        .map(|tag| NewRecipeTagRow {
            recipe_id,
            tag_id: tag.0,
        })
        .collect();
    diesel::insert_into(recipe_tags::table)
        .values(&tag_rows)
        .execute(conn)
        .await?;
    Ok(())
}

/// Batch-load authors, ingredient links, and tag links for the given
/// recipe rows and assemble full records, preserving row order.
async fn assemble_records(
    conn: &mut AsyncPgConnection,
    rows: Vec<RecipeRow>,
) -> Result<Vec<RecipeRecord>, TxError> {
    let recipe_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let author_ids: Vec<i32> = rows.iter().map(|row| row.author_id).collect();

    let author_rows: Vec<UserRow> = users::table
        .filter(users::id.eq_any(&author_ids))
        .select(UserRow::as_select())
        .load(conn)
        .await?;
    let mut authors: HashMap<i32, User> = HashMap::with_capacity(author_rows.len());
    for row in author_rows {
        let id = row.id;
        let user = row
            .into_user()
            .map_err(|error| invalid_row(error.message().to_owned()))?;
        authors.insert(id, user);
    }

    let ingredient_links: Vec<(i32, i32, IngredientRow)> = recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq_any(&recipe_ids))
        .order_by(recipe_ingredients::id)
        .select((
            recipe_ingredients::recipe_id,
            recipe_ingredients::amount,
            IngredientRow::as_select(),
        ))
        .load(conn)
        .await?;
    let mut ingredients_by_recipe: HashMap<i32, Vec<(Ingredient, u32)>> = HashMap::new();
    for (recipe_id, amount, row) in ingredient_links {
        ingredients_by_recipe
            .entry(recipe_id)
            .or_default()
            .push((Ingredient::from(row), amount.unsigned_abs()));
    }

    let tag_links: Vec<(i32, TagRow)> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq_any(&recipe_ids))
        .order_by(recipe_tags::id)
        .select((recipe_tags::recipe_id, TagRow::as_select()))
        .load(conn)
        .await?;
    let mut tags_by_recipe: HashMap<i32, Vec<Tag>> = HashMap::new();
    for (recipe_id, row) in tag_links {
        tags_by_recipe
            .entry(recipe_id)
            .or_default()
            .push(Tag::from(row));
    }

    rows.into_iter()
        .map(|row| {
            let author = authors
                .get(&row.author_id)
                .cloned()
                .ok_or_else(|| invalid_row(format!("recipe {} has no author row", row.id)))?;
            Ok(RecipeRecord {
                id: RecipeId(row.id),
                author,
                name: row.name,
                image: row.image,
                text: row.text,
                cooking_time: row.cooking_time.unsigned_abs(),
                ingredients: ingredients_by_recipe.remove(&row.id).unwrap_or_default(),
                tags: tags_by_recipe.remove(&row.id).unwrap_or_default(),
                created_at: row.created_at,
            })
        })
        .collect()
}

/// `(favourited, in-cart)` recipe-id sets for a viewer, restricted to the
/// given recipes.
async fn viewer_mark_sets(
    conn: &mut AsyncPgConnection,
    viewer: UserId,
    recipe_ids: &[i32],
) -> Result<(HashSet<i32>, HashSet<i32>), TxError> {
    let favorited: HashSet<i32> = favorites::table
        .filter(favorites::user_id.eq(viewer.0))
        .filter(favorites::recipe_id.eq_any(recipe_ids))
        .select(favorites::recipe_id)
        .load::<i32>(conn)
        .await?
        .into_iter()
        .collect();
    let in_cart: HashSet<i32> = shopping_cart_items::table
        .filter(shopping_cart_items::user_id.eq(viewer.0))
        .filter(shopping_cart_items::recipe_id.eq_any(recipe_ids))
        .select(shopping_cart_items::recipe_id)
        .load::<i32>(conn)
        .await?
        .into_iter()
        .collect();
    Ok((favorited, in_cart))
}

/// Build the filtered base query; constructed fresh for the count and
/// page queries because boxed queries are not clonable.
fn filtered_recipes(
    filter: &RecipeListFilter,
) -> recipes::BoxedQuery<'static, diesel::pg::Pg> {
    let mut query = recipes::table.into_boxed();

    if !filter.tag_slugs.is_empty() {
        let tagged = recipe_tags::table
            .inner_join(tags::table)
            .filter(tags::slug.eq_any(filter.tag_slugs.clone()))
            .select(recipe_tags::recipe_id);
        query = query.filter(recipes::id.eq_any(tagged));
    }
    if let Some(author) = filter.author {
        query = query.filter(recipes::author_id.eq(author.0));
    }
    if let Some(viewer) = filter.viewer {
        if let Some(wanted) = filter.is_favorited {
            let marked = favorites::table
                .filter(favorites::user_id.eq(viewer.0))
                .select(favorites::recipe_id);
            query = if wanted {
                query.filter(recipes::id.eq_any(marked))
            } else {
                query.filter(recipes::id.ne_all(marked))
            };
        }
        if let Some(wanted) = filter.is_in_shopping_cart {
            let carted = shopping_cart_items::table
                .filter(shopping_cart_items::user_id.eq(viewer.0))
                .select(shopping_cart_items::recipe_id);
            query = if wanted {
                query.filter(recipes::id.eq_any(carted))
            } else {
                query.filter(recipes::id.ne_all(carted))
            };
        }
    }
    query
}

#[async_trait]
impl RecipeRepository for DieselRecipeRepository {
    async fn create(
        &self,
        author: UserId,
        draft: &RecipeDraft,
        image_path: &str,
    ) -> Result<RecipeRecord, RecipeWriteError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let record = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    check_references(conn, draft).await?;

                    let row = NewRecipeRow {
                        author_id: author.0,
                        name: draft.name(),
                        image: image_path,
                        text: draft.text(),
                        cooking_time: cooking_time_to_db(draft.cooking_time()),
                    };
                    let inserted: RecipeRow = diesel::insert_into(recipes::table)
                        .values(&row)
                        .returning(RecipeRow::as_returning())
                        .get_result(conn)
                        .await?;

                    insert_links(conn, inserted.id, draft).await?;

                    let mut records = assemble_records(conn, vec![inserted]).await?;
                    records
                        .pop()
                        .ok_or_else(|| invalid_row("inserted recipe did not assemble"))
                }
                .scope_boxed()
            })
            .await?;
        Ok(record)
    }

    async fn update(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
        image_path: Option<&str>,
    ) -> Result<RecipeRecord, RecipeWriteError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let record = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let existing: Option<RecipeRow> = recipes::table
                        .find(id.0)
                        .select(RecipeRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    if existing.is_none() {
                        return Err(TxError::Write(RecipeWriteError::NotFound));
                    }

                    check_references(conn, draft).await?;

                    diesel::update(recipes::table.find(id.0))
                        .set((
                            recipes::name.eq(draft.name()),
                            recipes::text.eq(draft.text()),
                            recipes::cooking_time.eq(cooking_time_to_db(draft.cooking_time())),
                        ))
                        .execute(conn)
                        .await?;
                    if let Some(path) = image_path {
                        diesel::update(recipes::table.find(id.0))
                            .set(recipes::image.eq(path))
                            .execute(conn)
                            .await?;
                    }

                    // Links are replaced wholesale; drafts carry the full set.
                    diesel::delete(
                        recipe_ingredients::table
                            .filter(recipe_ingredients::recipe_id.eq(id.0)),
                    )
                    .execute(conn)
                    .await?;
                    diesel::delete(
                        recipe_tags::table.filter(recipe_tags::recipe_id.eq(id.0)),
                    )
                    .execute(conn)
                    .await?;
                    insert_links(conn, id.0, draft).await?;

                    let updated: RecipeRow = recipes::table
                        .find(id.0)
                        .select(RecipeRow::as_select())
                        .first(conn)
                        .await?;
                    let mut records = assemble_records(conn, vec![updated]).await?;
                    records
                        .pop()
                        .ok_or_else(|| invalid_row("updated recipe did not assemble"))
                }
                .scope_boxed()
            })
            .await?;
        Ok(record)
    }

    async fn delete(&self, id: RecipeId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(recipes::table.find(id.0))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn find(&self, id: RecipeId) -> Result<Option<RecipeRecord>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<RecipeRow> = recipes::table
            .find(id.0)
            .select(RecipeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut records = assemble_records(&mut conn, vec![row]).await?;
        Ok(records.pop())
    }

    async fn list(
        &self,
        filter: &RecipeListFilter,
        page: PageRequest,
    ) -> Result<PageOf<RecipeWithFlags>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = filtered_recipes(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let rows: Vec<RecipeRow> = filtered_recipes(filter)
            .order_by(recipes::created_at.desc())
            .then_order_by(recipes::id.desc())
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(RecipeRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let recipe_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let records = assemble_records(&mut conn, rows).await?;

        let (favorited, in_cart) = match filter.viewer {
            Some(viewer) => viewer_mark_sets(&mut conn, viewer, &recipe_ids).await?,
            None => (HashSet::new(), HashSet::new()),
        };

        let items = records
            .into_iter()
            .map(|record| {
                let flags = ViewerFlags {
                    is_favorited: favorited.contains(&record.id.0),
                    is_in_shopping_cart: in_cart.contains(&record.id.0),
                };
                RecipeWithFlags { record, flags }
            })
            .collect();
        Ok(PageOf::new(count.unsigned_abs(), items))
    }

    async fn summaries_by_author(
        &self,
        author: UserId,
        limit: u32,
    ) -> Result<Vec<RecipeSummary>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<RecipeRow> = recipes::table
            .filter(recipes::author_id.eq(author.0))
            .order_by(recipes::created_at.desc())
            .then_order_by(recipes::id.desc())
            .limit(i64::from(limit))
            .select(RecipeRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|row| RecipeSummary {
                id: RecipeId(row.id),
                name: row.name,
                image: row.image,
                cooking_time: row.cooking_time.unsigned_abs(),
            })
            .collect())
    }

    async fn viewer_flags(
        &self,
        viewer: Option<UserId>,
        recipe: RecipeId,
    ) -> Result<ViewerFlags, RepositoryError> {
        let Some(viewer) = viewer else {
            return Ok(ViewerFlags::default());
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let (favorited, in_cart) = viewer_mark_sets(&mut conn, viewer, &[recipe.0]).await?;
        Ok(ViewerFlags {
            is_favorited: favorited.contains(&recipe.0),
            is_in_shopping_cart: in_cart.contains(&recipe.0),
        })
    }
}
