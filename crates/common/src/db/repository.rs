//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations.
//! Recipe writes run inside one transaction; relationship writes
//! lean on the unique indexes created by [`super::schema`].

use crate::db::models::*;
use crate::db::DbPool;
use crate::domain::composition::Composition;
use crate::domain::short_link;
use crate::domain::ShoppingList;
use crate::errors::{AppError, ErrorCode, Result, ValidationErrors};
use sea_orm::sea_query::{Expr, Func, LikeExpr, OnConflict, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Rows per multi-row insert when importing catalogue data
const IMPORT_BATCH_SIZE: usize = 500;

/// Short-link candidates tried before a recipe insert gives up
const SHORT_LINK_ATTEMPTS: usize = 8;

/// Recipe list filters; membership flags only apply to an authenticated viewer
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author_id: Option<i32>,
    /// Tag slugs, matched with OR semantics
    pub tag_slugs: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

/// A user as seen by a particular viewer
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub is_subscribed: bool,
}

/// One ingredient of a recipe with its catalogue data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientLine {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A recipe with everything a detail view needs
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: UserProfile,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// A followed author with their newest recipes
#[derive(Debug, Clone, Serialize)]
pub struct AuthorSummary {
    pub profile: UserProfile,
    pub recipes: Vec<Recipe>,
    pub recipes_count: u64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user; `password_hash` must already be hashed
    pub async fn create_user(
        &self,
        email: String,
        username: String,
        first_name: String,
        last_name: String,
        password_hash: String,
    ) -> Result<User> {
        let taken = UserEntity::find()
            .filter(
                sea_orm::Condition::any()
                    .add(UserColumn::Email.eq(email.as_str()))
                    .add(UserColumn::Username.eq(username.as_str())),
            )
            .count(self.write_conn())
            .await?;
        if taken > 0 {
            return Err(AppError::AlreadyExists {
                message: "a user with this email or username already exists".to_string(),
            });
        }

        let user = UserActiveModel {
            email: Set(email),
            username: Set(username),
            first_name: Set(first_name),
            last_name: Set(last_name),
            password_hash: Set(password_hash),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        user.insert(self.write_conn())
            .await
            .map_err(|e| AppError::from_insert(e, "a user with this email or username already exists"))
    }

    /// Find user by ID
    pub async fn find_user(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Get user by ID or fail with `NotFound`
    pub async fn get_user(&self, id: i32) -> Result<User> {
        self.find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    /// List users ordered by ID
    pub async fn list_users(&self, offset: u64, limit: u64) -> Result<(Vec<User>, u64)> {
        let query = UserEntity::find();
        let total = query.clone().count(self.read_conn()).await?;

        let users = query
            .order_by_asc(UserColumn::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((users, total))
    }

    /// Replace a user's password hash
    pub async fn set_password_hash(&self, user: User, password_hash: String) -> Result<()> {
        let mut active: UserActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.update(self.write_conn()).await?;
        Ok(())
    }

    /// Set or clear a user's avatar, returning the updated row
    pub async fn set_avatar(&self, user: User, avatar: Option<String>) -> Result<User> {
        let mut active: UserActiveModel = user.into();
        active.avatar = Set(avatar);
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Attach `is_subscribed` from `viewer`'s point of view
    pub async fn user_profiles(
        &self,
        users: Vec<User>,
        viewer: Option<i32>,
    ) -> Result<Vec<UserProfile>> {
        let followed: HashSet<i32> = match viewer {
            Some(viewer) if !users.is_empty() => FollowEntity::find()
                .select_only()
                .column(FollowColumn::FollowingId)
                .filter(FollowColumn::UserId.eq(viewer))
                .filter(FollowColumn::FollowingId.is_in(users.iter().map(|u| u.id).collect::<Vec<_>>()))
                .into_tuple::<i32>()
                .all(self.read_conn())
                .await?
                .into_iter()
                .collect(),
            _ => HashSet::new(),
        };

        Ok(users
            .into_iter()
            .map(|user| UserProfile {
                is_subscribed: followed.contains(&user.id),
                user,
            })
            .collect())
    }

    /// Single-user form of [`Self::user_profiles`]
    pub async fn user_profile(&self, user: User, viewer: Option<i32>) -> Result<UserProfile> {
        let user_id = user.id;
        self.user_profiles(vec![user], viewer)
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("User", user_id))
    }

    // ========================================================================
    // Catalogue Operations
    // ========================================================================

    /// All tags ordered by ID
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        TagEntity::find()
            .order_by_asc(TagColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_tag(&self, id: i32) -> Result<Tag> {
        TagEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .ok_or_else(|| AppError::not_found("Tag", id))
    }

    /// Ingredients ordered by name, optionally filtered by a case-insensitive prefix
    pub async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        let mut query = IngredientEntity::find();

        if let Some(prefix) = name_prefix.filter(|p| !p.is_empty()) {
            let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(IngredientColumn::Name)))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }

        query
            .order_by_asc(IngredientColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_ingredient(&self, id: i32) -> Result<Ingredient> {
        IngredientEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .ok_or_else(|| AppError::not_found("Ingredient", id))
    }

    /// The subset of `ids` naming existing tags
    pub async fn existing_tag_ids(&self, ids: &[i32]) -> Result<HashSet<i32>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let found = TagEntity::find()
            .select_only()
            .column(TagColumn::Id)
            .filter(TagColumn::Id.is_in(ids.to_vec()))
            .into_tuple::<i32>()
            .all(self.read_conn())
            .await?;
        Ok(found.into_iter().collect())
    }

    /// The subset of `ids` naming existing ingredients
    pub async fn existing_ingredient_ids(&self, ids: &[i32]) -> Result<HashSet<i32>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let found = IngredientEntity::find()
            .select_only()
            .column(IngredientColumn::Id)
            .filter(IngredientColumn::Id.is_in(ids.to_vec()))
            .into_tuple::<i32>()
            .all(self.read_conn())
            .await?;
        Ok(found.into_iter().collect())
    }

    /// Bulk insert `(name, measurement_unit)` pairs, skipping names already present.
    /// Returns the number of rows written.
    ///
    /// Every record is checked against the column limits first; one bad record
    /// rejects the whole import.
    pub async fn import_ingredients(&self, items: Vec<(String, String)>) -> Result<u64> {
        check_import(
            &items,
            ("name", ingredient::NAME_MAX_LENGTH),
            ("measurement_unit", ingredient::MEASUREMENT_UNIT_MAX_LENGTH),
        )?;

        let mut inserted = 0;
        for batch in items.chunks(IMPORT_BATCH_SIZE) {
            let models = batch.iter().map(|(name, unit)| IngredientActiveModel {
                name: Set(name.clone()),
                measurement_unit: Set(unit.clone()),
                ..Default::default()
            });

            inserted += IngredientEntity::insert_many(models)
                .on_conflict(
                    OnConflict::column(IngredientColumn::Name)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(self.write_conn())
                .await?;
        }
        Ok(inserted)
    }

    /// Bulk insert `(name, slug)` pairs, skipping any that collide.
    /// Returns the number of rows written.
    pub async fn import_tags(&self, items: Vec<(String, String)>) -> Result<u64> {
        check_import(
            &items,
            ("name", tag::NAME_MAX_LENGTH),
            ("slug", tag::SLUG_MAX_LENGTH),
        )?;

        let mut inserted = 0;
        for batch in items.chunks(IMPORT_BATCH_SIZE) {
            let models = batch.iter().map(|(name, slug)| TagActiveModel {
                name: Set(name.clone()),
                slug: Set(slug.clone()),
                ..Default::default()
            });

            inserted += TagEntity::insert_many(models)
                .on_conflict(OnConflict::new().do_nothing().to_owned())
                .exec_without_returning(self.write_conn())
                .await?;
        }
        Ok(inserted)
    }

    // ========================================================================
    // Recipe Operations
    // ========================================================================

    /// Persist a validated recipe with its tags and ingredient amounts.
    ///
    /// Either every row is written or none is.
    pub async fn create_recipe(
        &self,
        author_id: i32,
        composition: &Composition,
        image: &str,
    ) -> Result<Recipe> {
        let txn = self.write_conn().begin().await?;

        let base = short_link::slugify(&composition.name);
        let taken = taken_short_links(&txn, &base).await?;
        let recipe = insert_recipe(&txn, author_id, composition, image, taken).await?;

        insert_composition(&txn, recipe.id, composition).await?;
        txn.commit().await?;

        tracing::debug!(recipe_id = recipe.id, short_link = %recipe.short_link, "Recipe created");
        Ok(recipe)
    }

    /// Overwrite a recipe's fields and replace its tags and ingredients wholesale.
    ///
    /// The short link assigned at creation is kept.
    pub async fn update_recipe(
        &self,
        recipe: Recipe,
        composition: &Composition,
        image: &str,
    ) -> Result<Recipe> {
        let recipe_id = recipe.id;
        let txn = self.write_conn().begin().await?;

        let mut active: RecipeActiveModel = recipe.into();
        active.name = Set(composition.name.clone());
        active.text = Set(composition.text.clone());
        active.cooking_time = Set(composition.cooking_time);
        active.image = Set(image.to_string());

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| AppError::from_insert(e, duplicate_recipe_name(&composition.name)))?;

        RecipeTagEntity::delete_many()
            .filter(RecipeTagColumn::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        RecipeIngredientEntity::delete_many()
            .filter(RecipeIngredientColumn::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;

        insert_composition(&txn, recipe_id, composition).await?;
        txn.commit().await?;

        Ok(updated)
    }

    /// Delete a recipe; join rows, favorites and cart items go with it
    pub async fn delete_recipe(&self, id: i32) -> Result<()> {
        let result = RecipeEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("Recipe", id));
        }
        Ok(())
    }

    /// Find recipe by ID
    pub async fn find_recipe(&self, id: i32) -> Result<Option<Recipe>> {
        RecipeEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Get recipe by ID or fail with `NotFound`
    pub async fn get_recipe(&self, id: i32) -> Result<Recipe> {
        self.find_recipe(id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe", id))
    }

    pub async fn find_recipe_by_short_link(&self, short_link: &str) -> Result<Option<Recipe>> {
        RecipeEntity::find()
            .filter(RecipeColumn::ShortLink.eq(short_link))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Filtered page of recipes, newest first, with the total match count
    pub async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<i32>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Recipe>, u64)> {
        let mut query = RecipeEntity::find();

        if let Some(author_id) = filter.author_id {
            query = query.filter(RecipeColumn::AuthorId.eq(author_id));
        }

        if !filter.tag_slugs.is_empty() {
            let tagged = Query::select()
                .column((RecipeTagEntity, RecipeTagColumn::RecipeId))
                .from(RecipeTagEntity)
                .inner_join(
                    TagEntity,
                    Expr::col((TagEntity, TagColumn::Id))
                        .equals((RecipeTagEntity, RecipeTagColumn::TagId)),
                )
                .and_where(Expr::col((TagEntity, TagColumn::Slug)).is_in(filter.tag_slugs.clone()))
                .to_owned();
            query = query.filter(RecipeColumn::Id.in_subquery(tagged));
        }

        // Anonymous viewers have no favorites or cart, so these flags are ignored
        if let Some(viewer) = viewer {
            if let Some(flag) = filter.is_favorited {
                let favorited = Query::select()
                    .column(FavoriteColumn::RecipeId)
                    .from(FavoriteEntity)
                    .and_where(FavoriteColumn::UserId.eq(viewer))
                    .to_owned();
                query = query.filter(membership(flag, favorited));
            }
            if let Some(flag) = filter.is_in_shopping_cart {
                let in_cart = Query::select()
                    .column(ShoppingCartColumn::RecipeId)
                    .from(ShoppingCartEntity)
                    .and_where(ShoppingCartColumn::UserId.eq(viewer))
                    .to_owned();
                query = query.filter(membership(flag, in_cart));
            }
        }

        let total = query.clone().count(self.read_conn()).await?;

        let recipes = query
            .order_by_desc(RecipeColumn::CreatedAt)
            .order_by_desc(RecipeColumn::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((recipes, total))
    }

    /// Load author, tags, ingredient lines and viewer flags for each recipe.
    ///
    /// Output order matches input order.
    pub async fn recipe_details(
        &self,
        recipes: Vec<Recipe>,
        viewer: Option<i32>,
    ) -> Result<Vec<RecipeDetails>> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.read_conn();
        let ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
        let author_ids: Vec<i32> = recipes
            .iter()
            .map(|r| r.author_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut tags: HashMap<i32, Vec<Tag>> = HashMap::new();
        for (link, tag) in RecipeTagEntity::find()
            .filter(RecipeTagColumn::RecipeId.is_in(ids.clone()))
            .find_also_related(TagEntity)
            .order_by_asc(RecipeTagColumn::Id)
            .all(conn)
            .await?
        {
            if let Some(tag) = tag {
                tags.entry(link.recipe_id).or_default().push(tag);
            }
        }

        let mut ingredients: HashMap<i32, Vec<IngredientLine>> = HashMap::new();
        for (line, ingredient) in RecipeIngredientEntity::find()
            .filter(RecipeIngredientColumn::RecipeId.is_in(ids.clone()))
            .find_also_related(IngredientEntity)
            .order_by_asc(RecipeIngredientColumn::Id)
            .all(conn)
            .await?
        {
            if let Some(ingredient) = ingredient {
                ingredients
                    .entry(line.recipe_id)
                    .or_default()
                    .push(IngredientLine {
                        id: ingredient.id,
                        name: ingredient.name,
                        measurement_unit: ingredient.measurement_unit,
                        amount: line.amount,
                    });
            }
        }

        let authors = UserEntity::find()
            .filter(UserColumn::Id.is_in(author_ids))
            .all(conn)
            .await?;
        let authors: HashMap<i32, UserProfile> = self
            .user_profiles(authors, viewer)
            .await?
            .into_iter()
            .map(|profile| (profile.user.id, profile))
            .collect();

        let (favorited, in_cart) = match viewer {
            Some(viewer) => (
                FavoriteEntity::find()
                    .select_only()
                    .column(FavoriteColumn::RecipeId)
                    .filter(FavoriteColumn::UserId.eq(viewer))
                    .filter(FavoriteColumn::RecipeId.is_in(ids.clone()))
                    .into_tuple::<i32>()
                    .all(conn)
                    .await?
                    .into_iter()
                    .collect::<HashSet<_>>(),
                ShoppingCartEntity::find()
                    .select_only()
                    .column(ShoppingCartColumn::RecipeId)
                    .filter(ShoppingCartColumn::UserId.eq(viewer))
                    .filter(ShoppingCartColumn::RecipeId.is_in(ids))
                    .into_tuple::<i32>()
                    .all(conn)
                    .await?
                    .into_iter()
                    .collect::<HashSet<_>>(),
            ),
            None => (HashSet::new(), HashSet::new()),
        };

        recipes
            .into_iter()
            .map(|recipe| {
                let author = authors
                    .get(&recipe.author_id)
                    .cloned()
                    .ok_or_else(|| AppError::not_found("User", recipe.author_id))?;
                Ok(RecipeDetails {
                    author,
                    tags: tags.remove(&recipe.id).unwrap_or_default(),
                    ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    recipe,
                })
            })
            .collect()
    }

    /// Single-recipe form of [`Self::recipe_details`]
    pub async fn recipe_detail(&self, recipe: Recipe, viewer: Option<i32>) -> Result<RecipeDetails> {
        let recipe_id = recipe.id;
        self.recipe_details(vec![recipe], viewer)
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("Recipe", recipe_id))
    }

    // ========================================================================
    // Favorites & Shopping Cart
    // ========================================================================

    /// Mark a recipe as a favorite of `user_id`
    pub async fn add_favorite(&self, user_id: i32, recipe_id: i32) -> Result<Recipe> {
        let recipe = self.get_recipe(recipe_id).await?;

        let exists = FavoriteEntity::find()
            .filter(FavoriteColumn::UserId.eq(user_id))
            .filter(FavoriteColumn::RecipeId.eq(recipe_id))
            .count(self.write_conn())
            .await?;
        let duplicate = format!("recipe {} is already in favorites", recipe_id);
        if exists > 0 {
            return Err(AppError::AlreadyExists { message: duplicate });
        }

        FavoriteActiveModel {
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(|e| AppError::from_insert(e, duplicate))?;

        Ok(recipe)
    }

    pub async fn remove_favorite(&self, user_id: i32, recipe_id: i32) -> Result<()> {
        self.get_recipe(recipe_id).await?;

        let result = FavoriteEntity::delete_many()
            .filter(FavoriteColumn::UserId.eq(user_id))
            .filter(FavoriteColumn::RecipeId.eq(recipe_id))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("Favorite", recipe_id));
        }
        Ok(())
    }

    /// Put a recipe into `user_id`'s shopping cart
    pub async fn add_to_cart(&self, user_id: i32, recipe_id: i32) -> Result<Recipe> {
        let recipe = self.get_recipe(recipe_id).await?;

        let exists = ShoppingCartEntity::find()
            .filter(ShoppingCartColumn::UserId.eq(user_id))
            .filter(ShoppingCartColumn::RecipeId.eq(recipe_id))
            .count(self.write_conn())
            .await?;
        let duplicate = format!("recipe {} is already in the shopping cart", recipe_id);
        if exists > 0 {
            return Err(AppError::AlreadyExists { message: duplicate });
        }

        ShoppingCartActiveModel {
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(|e| AppError::from_insert(e, duplicate))?;

        Ok(recipe)
    }

    pub async fn remove_from_cart(&self, user_id: i32, recipe_id: i32) -> Result<()> {
        self.get_recipe(recipe_id).await?;

        let result = ShoppingCartEntity::delete_many()
            .filter(ShoppingCartColumn::UserId.eq(user_id))
            .filter(ShoppingCartColumn::RecipeId.eq(recipe_id))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("ShoppingCartItem", recipe_id));
        }
        Ok(())
    }

    /// Aggregated ingredients of every recipe in `user_id`'s cart.
    ///
    /// Reads the primary so a download right after a cart change sees it.
    pub async fn shopping_list(&self, user_id: i32) -> Result<ShoppingList> {
        let conn = self.write_conn();

        let recipe_ids = ShoppingCartEntity::find()
            .select_only()
            .column(ShoppingCartColumn::RecipeId)
            .filter(ShoppingCartColumn::UserId.eq(user_id))
            .into_tuple::<i32>()
            .all(conn)
            .await?;
        if recipe_ids.is_empty() {
            return Ok(ShoppingList::default());
        }

        let rows = RecipeIngredientEntity::find()
            .select_only()
            .column(IngredientColumn::Name)
            .column(IngredientColumn::MeasurementUnit)
            .column(RecipeIngredientColumn::Amount)
            .inner_join(IngredientEntity)
            .filter(RecipeIngredientColumn::RecipeId.is_in(recipe_ids))
            .into_tuple::<(String, String, i32)>()
            .all(conn)
            .await?;

        Ok(ShoppingList::aggregate(rows))
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribe `user_id` to `target_id`'s recipes
    pub async fn follow(&self, user_id: i32, target_id: i32) -> Result<User> {
        if user_id == target_id {
            return Err(AppError::SelfReference {
                message: "cannot subscribe to yourself".to_string(),
            });
        }
        let target = self.get_user(target_id).await?;

        let exists = FollowEntity::find()
            .filter(FollowColumn::UserId.eq(user_id))
            .filter(FollowColumn::FollowingId.eq(target_id))
            .count(self.write_conn())
            .await?;
        let duplicate = format!("already subscribed to user {}", target_id);
        if exists > 0 {
            return Err(AppError::AlreadyExists { message: duplicate });
        }

        FollowActiveModel {
            user_id: Set(user_id),
            following_id: Set(target_id),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await
        .map_err(|e| AppError::from_insert(e, duplicate))?;

        Ok(target)
    }

    pub async fn unfollow(&self, user_id: i32, target_id: i32) -> Result<()> {
        self.get_user(target_id).await?;

        let result = FollowEntity::delete_many()
            .filter(FollowColumn::UserId.eq(user_id))
            .filter(FollowColumn::FollowingId.eq(target_id))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("Subscription", target_id));
        }
        Ok(())
    }

    /// Authors `user_id` follows, ordered by ID, with the total count
    pub async fn subscriptions(
        &self,
        user_id: i32,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<User>, u64)> {
        let followed = Query::select()
            .column(FollowColumn::FollowingId)
            .from(FollowEntity)
            .and_where(FollowColumn::UserId.eq(user_id))
            .to_owned();

        let query = UserEntity::find().filter(UserColumn::Id.in_subquery(followed));
        let total = query.clone().count(self.read_conn()).await?;

        let users = query
            .order_by_asc(UserColumn::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((users, total))
    }

    /// Each author with up to `recipes_limit` newest recipes and their recipe count
    pub async fn author_summaries(
        &self,
        authors: Vec<User>,
        viewer: Option<i32>,
        recipes_limit: Option<usize>,
    ) -> Result<Vec<AuthorSummary>> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<i32> = authors.iter().map(|u| u.id).collect();
        let mut by_author: HashMap<i32, Vec<Recipe>> = HashMap::new();
        for recipe in RecipeEntity::find()
            .filter(RecipeColumn::AuthorId.is_in(author_ids))
            .order_by_desc(RecipeColumn::CreatedAt)
            .order_by_desc(RecipeColumn::Id)
            .all(self.read_conn())
            .await?
        {
            by_author.entry(recipe.author_id).or_default().push(recipe);
        }

        Ok(self
            .user_profiles(authors, viewer)
            .await?
            .into_iter()
            .map(|profile| {
                let mut recipes = by_author.remove(&profile.user.id).unwrap_or_default();
                let recipes_count = recipes.len() as u64;
                if let Some(limit) = recipes_limit {
                    recipes.truncate(limit);
                }
                AuthorSummary {
                    profile,
                    recipes,
                    recipes_count,
                }
            })
            .collect())
    }
}

/// Short links starting with `base` that are visible to `conn`
async fn taken_short_links<C: ConnectionTrait>(conn: &C, base: &str) -> Result<HashSet<String>> {
    let taken = RecipeEntity::find()
        .select_only()
        .column(RecipeColumn::ShortLink)
        .filter(RecipeColumn::ShortLink.starts_with(base))
        .into_tuple::<String>()
        .all(conn)
        .await?;
    Ok(taken.into_iter().collect())
}

/// Insert the recipe row under the first short link not in `taken`.
///
/// `taken` may be stale: a concurrent writer can claim the same candidate
/// between the read and the insert. The insert then runs in a savepoint, and
/// a unique violation moves on to the next suffix unless the name itself is
/// the duplicate.
pub(crate) async fn insert_recipe(
    txn: &DatabaseTransaction,
    author_id: i32,
    composition: &Composition,
    image: &str,
    mut taken: HashSet<String>,
) -> Result<Recipe> {
    let base = short_link::slugify(&composition.name);

    for _ in 0..SHORT_LINK_ATTEMPTS {
        let candidate = short_link::disambiguate(&base, &taken);
        let row = RecipeActiveModel {
            author_id: Set(author_id),
            name: Set(composition.name.clone()),
            text: Set(composition.text.clone()),
            cooking_time: Set(composition.cooking_time),
            image: Set(image.to_string()),
            short_link: Set(candidate.clone()),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let savepoint = txn.begin().await?;
        match row.insert(&savepoint).await {
            Ok(recipe) => {
                savepoint.commit().await?;
                return Ok(recipe);
            }
            Err(e) if is_unique_violation(&e) => {
                savepoint.rollback().await?;

                let same_name = RecipeEntity::find()
                    .filter(RecipeColumn::Name.eq(composition.name.as_str()))
                    .count(txn)
                    .await?;
                if same_name > 0 {
                    return Err(AppError::AlreadyExists {
                        message: duplicate_recipe_name(&composition.name),
                    });
                }

                tracing::debug!(short_link = %candidate, "Short link claimed concurrently, retrying");
                taken.insert(candidate);
                taken.extend(taken_short_links(txn, &base).await?);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal {
        message: format!("no free short link for '{}'", base),
    })
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn duplicate_recipe_name(name: &str) -> String {
    format!("a recipe named '{}' already exists", name)
}

/// Reject import records that are blank or longer than their column
fn check_import(
    items: &[(String, String)],
    first: (&str, usize),
    second: (&str, usize),
) -> Result<()> {
    let mut errors = ValidationErrors::new();

    for (index, (a, b)) in items.iter().enumerate() {
        for (value, (field, max)) in [(a, first), (b, second)] {
            let key = format!("{}[{}]", field, index);
            if value.trim().is_empty() {
                errors.add(&key, ErrorCode::MissingField, "must not be blank");
            } else if value.chars().count() > max {
                errors.add(
                    &key,
                    ErrorCode::InvalidFormat,
                    format!("must be at most {} characters", max),
                );
            }
        }
    }

    errors.into_result()
}

async fn insert_composition(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    composition: &Composition,
) -> Result<()> {
    let tags: Vec<RecipeTagActiveModel> = composition
        .tag_ids
        .iter()
        .map(|&tag_id| RecipeTagActiveModel {
            recipe_id: Set(recipe_id),
            tag_id: Set(tag_id),
            ..Default::default()
        })
        .collect();
    if !tags.is_empty() {
        RecipeTagEntity::insert_many(tags).exec(txn).await?;
    }

    let lines: Vec<RecipeIngredientActiveModel> = composition
        .ingredients
        .iter()
        .map(|line| RecipeIngredientActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(line.ingredient_id),
            amount: Set(line.amount),
            ..Default::default()
        })
        .collect();
    if !lines.is_empty() {
        RecipeIngredientEntity::insert_many(lines).exec(txn).await?;
    }

    Ok(())
}

fn membership(flag: bool, ids: SelectStatement) -> sea_orm::sea_query::SimpleExpr {
    if flag {
        RecipeColumn::Id.in_subquery(ids)
    } else {
        RecipeColumn::Id.not_in_subquery(ids)
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
