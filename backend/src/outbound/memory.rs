//! In-memory adapters implementing every persistence port.
//!
//! Backs handler tests and the database-less development mode. The store
//! mirrors the semantics of the Diesel adapters, including uniqueness
//! arbitration and ordering, so tests exercise the same contracts the
//! production adapters honour.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{PageOf, PageRequest};

use crate::domain::catalogue::{Ingredient, IngredientId, NewIngredient, Tag, TagId};
use crate::domain::image::ImageUpload;
use crate::domain::ports::{
    AuthorProfile, CatalogueRepository, CreateUserError, MarkError, MarksRepository,
    MediaCategory, MediaError, MediaStore, RecipeListFilter, RecipeRepository, RecipeWithFlags,
    RecipeWriteError, RepositoryError, SubscribeError, SubscriptionRepository, UserRepository,
};
use crate::domain::recipe::{RecipeDraft, RecipeId, RecipeRecord, RecipeSummary, ViewerFlags};
use crate::domain::shopping_list::ShoppingListLine;
use crate::domain::user::{NewUser, User, UserId};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct StoredRecipe {
    id: i32,
    author_id: i32,
    name: String,
    image: String,
    text: String,
    cooking_time: u32,
    ingredients: Vec<(IngredientId, u32)>,
    tags: Vec<TagId>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<StoredUser>,
    subscriptions: HashSet<(i32, i32)>,
    ingredients: Vec<Ingredient>,
    tags: Vec<Tag>,
    recipes: Vec<StoredRecipe>,
    favorites: HashSet<(i32, i32)>,
    cart: HashSet<(i32, i32)>,
    media: HashMap<String, Vec<u8>>,
    next_user_id: i32,
    next_ingredient_id: i32,
    next_tag_id: i32,
    next_recipe_id: i32,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared in-memory state behind a mutex; cloning shares the state.
#[derive(Clone)]
pub struct StateCell {
    inner: Arc<Mutex<State>>,
}

impl StateCell {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                next_user_id: 1,
                next_ingredient_id: 1,
                next_tag_id: 1,
                next_recipe_id: 1,
                ..State::default()
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory store implementing every persistence port.
///
/// Clones share state, so one store can be handed to the HTTP adapter
/// once per port.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: StateCell,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, assigning the next id.
    pub fn seed_tag(&self, name: &str, slug: &str) -> Tag {
        let mut state = self.state.lock();
        let id = TagId(state.next_tag_id);
        state.next_tag_id += 1;
        let tag = Tag {
            id,
            name: name.to_owned(),
            slug: slug.to_owned(),
        };
        state.tags.push(tag.clone());
        tag
    }

    /// Insert an ingredient, assigning the next id.
    pub fn seed_ingredient(&self, name: &str, measurement_unit: &str) -> Ingredient {
        let mut state = self.state.lock();
        let id = IngredientId(state.next_ingredient_id);
        state.next_ingredient_id += 1;
        let ingredient = Ingredient {
            id,
            name: name.to_owned(),
            measurement_unit: measurement_unit.to_owned(),
        };
        state.ingredients.push(ingredient.clone());
        ingredient
    }

    /// Promote a user to staff; test helper for the moderation rules.
    pub fn make_staff(&self, id: UserId) {
        let mut state = self.state.lock();
        if let Some(stored) = state.users.iter_mut().find(|stored| stored.user.id == id) {
            stored.user.is_staff = true;
        }
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> PageOf<T> {
    let count = items.len() as u64;
    let items = items
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.limit() as usize)
        .collect();
    PageOf::new(count, items)
}

fn assemble(state: &State, recipe: &StoredRecipe) -> Result<RecipeRecord, RepositoryError> {
    let author = state
        .users
        .iter()
        .find(|stored| stored.user.id.0 == recipe.author_id)
        .map(|stored| stored.user.clone())
        .ok_or_else(|| RepositoryError::query(format!("recipe {} has no author", recipe.id)))?;
    let ingredients = recipe
        .ingredients
        .iter()
        .map(|(id, amount)| {
            state
                .ingredients
                .iter()
                .find(|ingredient| ingredient.id == *id)
                .cloned()
                .map(|ingredient| (ingredient, *amount))
                .ok_or_else(|| RepositoryError::query(format!("unknown ingredient {id}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let tags = recipe
        .tags
        .iter()
        .map(|id| {
            state
                .tags
                .iter()
                .find(|tag| tag.id == *id)
                .cloned()
                .ok_or_else(|| RepositoryError::query(format!("unknown tag {id}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecipeRecord {
        id: RecipeId(recipe.id),
        author,
        name: recipe.name.clone(),
        image: recipe.image.clone(),
        text: recipe.text.clone(),
        cooking_time: recipe.cooking_time,
        ingredients,
        tags,
        created_at: recipe.created_at,
    })
}

fn check_draft_references(state: &State, draft: &RecipeDraft) -> Result<(), RecipeWriteError> {
    let known_ingredients: HashSet<IngredientId> = state
        .ingredients
        .iter()
        .map(|ingredient| ingredient.id)
        .collect();
    let mut missing: Vec<IngredientId> = draft
        .ingredients()
        .iter()
        .map(|entry| entry.ingredient)
        .filter(|id| !known_ingredients.contains(id))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(RecipeWriteError::UnknownIngredients(missing));
    }

    let known_tags: HashSet<TagId> = state.tags.iter().map(|tag| tag.id).collect();
    let mut missing: Vec<TagId> = draft
        .tags()
        .iter()
        .copied()
        .filter(|id| !known_tags.contains(id))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(RecipeWriteError::UnknownTags(missing));
    }
    Ok(())
}

fn matches_filter(state: &State, recipe: &StoredRecipe, filter: &RecipeListFilter) -> bool {
    if !filter.tag_slugs.is_empty() {
        let carries_slug = recipe.tags.iter().any(|id| {
            state
                .tags
                .iter()
                .any(|tag| tag.id == *id && filter.tag_slugs.contains(&tag.slug))
        });
        if !carries_slug {
            return false;
        }
    }
    if let Some(author) = filter.author
        && recipe.author_id != author.0
    {
        return false;
    }
    if let Some(viewer) = filter.viewer {
        if let Some(wanted) = filter.is_favorited
            && state.favorites.contains(&(viewer.0, recipe.id)) != wanted
        {
            return false;
        }
        if let Some(wanted) = filter.is_in_shopping_cart
            && state.cart.contains(&(viewer.0, recipe.id)) != wanted
        {
            return false;
        }
    }
    true
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: &NewUser) -> Result<User, CreateUserError> {
        let mut state = self.state.lock();
        if state
            .users
            .iter()
            .any(|stored| stored.user.username == user.username)
        {
            return Err(CreateUserError::DuplicateUsername);
        }
        if state
            .users
            .iter()
            .any(|stored| stored.user.email == user.email)
        {
            return Err(CreateUserError::DuplicateEmail);
        }
        let id = UserId(state.next_user_id);
        state.next_user_id += 1;
        let created = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar: None,
            is_staff: false,
        };
        state.users.push(StoredUser {
            user: created.clone(),
            password_hash: user.password_hash.clone(),
        });
        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock();
        Ok(state
            .users
            .iter()
            .find(|stored| stored.user.id == id)
            .map(|stored| stored.user.clone()))
    }

    async fn find_by_email_with_hash(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.lock();
        Ok(state
            .users
            .iter()
            .find(|stored| stored.user.email.as_ref() == email)
            .map(|stored| (stored.user.clone(), stored.password_hash.clone())))
    }

    async fn list(&self, page: PageRequest) -> Result<PageOf<User>, RepositoryError> {
        let state = self.state.lock();
        let mut users: Vec<User> = state.users.iter().map(|stored| stored.user.clone()).collect();
        users.sort_by(|a, b| a.username.as_ref().cmp(b.username.as_ref()));
        Ok(paginate(users, page))
    }

    async fn set_avatar(
        &self,
        id: UserId,
        avatar: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let mut state = self.state.lock();
        let stored = state
            .users
            .iter_mut()
            .find(|stored| stored.user.id == id)
            .ok_or_else(|| RepositoryError::query(format!("no user {id}")))?;
        let previous = stored.user.avatar.take();
        stored.user.avatar = avatar.map(str::to_owned);
        Ok(previous)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn subscribe(&self, follower: UserId, author: UserId) -> Result<(), SubscribeError> {
        let mut state = self.state.lock();
        if !state.subscriptions.insert((follower.0, author.0)) {
            return Err(SubscribeError::AlreadySubscribed);
        }
        Ok(())
    }

    async fn unsubscribe(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock();
        Ok(state.subscriptions.remove(&(follower.0, author.0)))
    }

    async fn is_subscribed(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.lock();
        Ok(state.subscriptions.contains(&(follower.0, author.0)))
    }

    async fn list_authors(
        &self,
        follower: UserId,
        page: PageRequest,
    ) -> Result<PageOf<AuthorProfile>, RepositoryError> {
        let state = self.state.lock();
        let mut authors: Vec<AuthorProfile> = state
            .users
            .iter()
            .filter(|stored| state.subscriptions.contains(&(follower.0, stored.user.id.0)))
            .map(|stored| AuthorProfile {
                user: stored.user.clone(),
                recipes_count: state
                    .recipes
                    .iter()
                    .filter(|recipe| recipe.author_id == stored.user.id.0)
                    .count() as i64,
            })
            .collect();
        authors.sort_by(|a, b| a.user.username.as_ref().cmp(b.user.username.as_ref()));
        Ok(paginate(authors, page))
    }

    async fn author_profile(
        &self,
        author: UserId,
    ) -> Result<Option<AuthorProfile>, RepositoryError> {
        let state = self.state.lock();
        Ok(state
            .users
            .iter()
            .find(|stored| stored.user.id == author)
            .map(|stored| AuthorProfile {
                user: stored.user.clone(),
                recipes_count: state
                    .recipes
                    .iter()
                    .filter(|recipe| recipe.author_id == author.0)
                    .count() as i64,
            }))
    }
}

#[async_trait]
impl CatalogueRepository for InMemoryStore {
    async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let state = self.state.lock();
        let mut tags = state.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn find_tag(&self, id: TagId) -> Result<Option<Tag>, RepositoryError> {
        let state = self.state.lock();
        Ok(state.tags.iter().find(|tag| tag.id == id).cloned())
    }

    async fn list_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>, RepositoryError> {
        let state = self.state.lock();
        let prefix = name_prefix.map(str::to_lowercase);
        let mut matched: Vec<Ingredient> = state
            .ingredients
            .iter()
            .filter(|ingredient| match &prefix {
                Some(prefix) => ingredient.name.to_lowercase().starts_with(prefix),
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matched)
    }

    async fn find_ingredient(
        &self,
        id: IngredientId,
    ) -> Result<Option<Ingredient>, RepositoryError> {
        let state = self.state.lock();
        Ok(state
            .ingredients
            .iter()
            .find(|ingredient| ingredient.id == id)
            .cloned())
    }

    async fn upsert_ingredients(
        &self,
        new_ingredients: &[NewIngredient],
    ) -> Result<usize, RepositoryError> {
        let mut state = self.state.lock();
        let mut inserted = 0;
        for candidate in new_ingredients {
            let exists = state.ingredients.iter().any(|ingredient| {
                ingredient.name == candidate.name
                    && ingredient.measurement_unit == candidate.measurement_unit
            });
            if exists {
                continue;
            }
            let id = IngredientId(state.next_ingredient_id);
            state.next_ingredient_id += 1;
            state.ingredients.push(Ingredient {
                id,
                name: candidate.name.clone(),
                measurement_unit: candidate.measurement_unit.clone(),
            });
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl RecipeRepository for InMemoryStore {
    async fn create(
        &self,
        author: UserId,
        draft: &RecipeDraft,
        image_path: &str,
    ) -> Result<RecipeRecord, RecipeWriteError> {
        let mut state = self.state.lock();
        check_draft_references(&state, draft)?;

        let id = state.next_recipe_id;
        state.next_recipe_id += 1;
        let recipe = StoredRecipe {
            id,
            author_id: author.0,
            name: draft.name().to_owned(),
            image: image_path.to_owned(),
            text: draft.text().to_owned(),
            cooking_time: draft.cooking_time(),
            ingredients: draft
                .ingredients()
                .iter()
                .map(|entry| (entry.ingredient, entry.amount))
                .collect(),
            tags: draft.tags().to_vec(),
            created_at: Utc::now(),
        };
        let record = assemble(&state, &recipe)?;
        state.recipes.push(recipe);
        Ok(record)
    }

    async fn update(
        &self,
        id: RecipeId,
        draft: &RecipeDraft,
        image_path: Option<&str>,
    ) -> Result<RecipeRecord, RecipeWriteError> {
        let mut state = self.state.lock();
        check_draft_references(&state, draft)?;

        let index = state
            .recipes
            .iter()
            .position(|recipe| recipe.id == id.0)
            .ok_or(RecipeWriteError::NotFound)?;
        let mut recipe = state.recipes[index].clone();
        recipe.name = draft.name().to_owned();
        recipe.text = draft.text().to_owned();
        recipe.cooking_time = draft.cooking_time();
        recipe.ingredients = draft
            .ingredients()
            .iter()
            .map(|entry| (entry.ingredient, entry.amount))
            .collect();
        recipe.tags = draft.tags().to_vec();
        if let Some(path) = image_path {
            recipe.image = path.to_owned();
        }
        let record = assemble(&state, &recipe)?;
        state.recipes[index] = recipe;
        Ok(record)
    }

    async fn delete(&self, id: RecipeId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock();
        let before = state.recipes.len();
        state.recipes.retain(|recipe| recipe.id != id.0);
        let removed = state.recipes.len() < before;
        if removed {
            state.favorites.retain(|(_, recipe)| *recipe != id.0);
            state.cart.retain(|(_, recipe)| *recipe != id.0);
        }
        Ok(removed)
    }

    async fn find(&self, id: RecipeId) -> Result<Option<RecipeRecord>, RepositoryError> {
        let state = self.state.lock();
        state
            .recipes
            .iter()
            .find(|recipe| recipe.id == id.0)
            .map(|recipe| assemble(&state, recipe))
            .transpose()
    }

    async fn list(
        &self,
        filter: &RecipeListFilter,
        page: PageRequest,
    ) -> Result<PageOf<RecipeWithFlags>, RepositoryError> {
        let state = self.state.lock();
        let mut matched: Vec<&StoredRecipe> = state
            .recipes
            .iter()
            .filter(|recipe| matches_filter(&state, recipe, filter))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let items = matched
            .iter()
            .map(|recipe| {
                let record = assemble(&state, recipe)?;
                let flags = match filter.viewer {
                    Some(viewer) => ViewerFlags {
                        is_favorited: state.favorites.contains(&(viewer.0, recipe.id)),
                        is_in_shopping_cart: state.cart.contains(&(viewer.0, recipe.id)),
                    },
                    None => ViewerFlags::default(),
                };
                Ok(RecipeWithFlags { record, flags })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        Ok(paginate(items, page))
    }

    async fn summaries_by_author(
        &self,
        author: UserId,
        limit: u32,
    ) -> Result<Vec<RecipeSummary>, RepositoryError> {
        let state = self.state.lock();
        let mut matched: Vec<&StoredRecipe> = state
            .recipes
            .iter()
            .filter(|recipe| recipe.author_id == author.0)
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matched
            .into_iter()
            .take(limit as usize)
            .map(|recipe| RecipeSummary {
                id: RecipeId(recipe.id),
                name: recipe.name.clone(),
                image: recipe.image.clone(),
                cooking_time: recipe.cooking_time,
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
        let state = self.state.lock();
        Ok(ViewerFlags {
            is_favorited: state.favorites.contains(&(viewer.0, recipe.0)),
            is_in_shopping_cart: state.cart.contains(&(viewer.0, recipe.0)),
        })
    }
}

#[async_trait]
impl MarksRepository for InMemoryStore {
    async fn add_favorite(&self, user: UserId, recipe: RecipeId) -> Result<(), MarkError> {
        let mut state = self.state.lock();
        if !state.favorites.insert((user.0, recipe.0)) {
            return Err(MarkError::Duplicate);
        }
        Ok(())
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock();
        Ok(state.favorites.remove(&(user.0, recipe.0)))
    }

    async fn add_to_cart(&self, user: UserId, recipe: RecipeId) -> Result<(), MarkError> {
        let mut state = self.state.lock();
        if !state.cart.insert((user.0, recipe.0)) {
            return Err(MarkError::Duplicate);
        }
        Ok(())
    }

    async fn remove_from_cart(
        &self,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock();
        Ok(state.cart.remove(&(user.0, recipe.0)))
    }

    async fn shopping_list(
        &self,
        user: UserId,
    ) -> Result<Vec<ShoppingListLine>, RepositoryError> {
        let state = self.state.lock();
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for recipe in &state.recipes {
            if !state.cart.contains(&(user.0, recipe.id)) {
                continue;
            }
            for (ingredient_id, amount) in &recipe.ingredients {
                let Some(ingredient) = state
                    .ingredients
                    .iter()
                    .find(|ingredient| ingredient.id == *ingredient_id)
                else {
                    continue;
                };
                let key = (
                    ingredient.name.clone(),
                    ingredient.measurement_unit.clone(),
                );
                *totals.entry(key).or_insert(0) += i64::from(*amount);
            }
        }
        Ok(totals
            .into_iter()
            .map(|((name, measurement_unit), total)| ShoppingListLine {
                name,
                measurement_unit,
                total,
            })
            .collect())
    }
}

#[async_trait]
impl MediaStore for InMemoryStore {
    async fn save(
        &self,
        upload: &ImageUpload,
        category: MediaCategory,
    ) -> Result<String, MediaError> {
        let mut state = self.state.lock();
        let path = format!("{}/{}", category.directory(), upload.generate_filename());
        state.media.insert(path.clone(), upload.bytes().to_vec());
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        state.media.remove(path);
        Ok(())
    }
}
