//! Recipe handlers
//!
//! Create and update run the same pipeline: look up the referenced catalogue
//! ids, validate the whole payload, store the image, then persist in one
//! transaction. A stored image is discarded again if persistence fails.
//!
//! An update may send back the recipe's current image reference to keep it.
//! Any other image must be a fresh upload, so a recipe only ever holds (and
//! on deletion discards) a file that was uploaded for it.

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::Query;
use serde::Deserialize;

use super::discard_image;
use crate::extract::JsonBody;
use crate::pagination::{Page, Window};
use crate::views::{recipe_short_view, recipe_view, short_link_view, RecipeShortView, RecipeView, ShortLinkView};
use crate::AppState;
use foodgram_common::{
    auth::AuthContext,
    db::models::Recipe,
    db::RecipeFilter,
    domain::{composition, Composition, KnownReferences, RecipePayload},
    errors::{AppError, Result},
    media::{ImageKind, StoredImage},
    metrics, Repository,
};

/// Name of the shopping list attachment
pub const SHOPPING_LIST_FILENAME: &str = "shopping.txt";

/// Query parameters for the recipe list
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub author: Option<i32>,
    /// Repeatable: `?tags=breakfast&tags=lunch`
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<u8>,
    pub is_in_shopping_cart: Option<u8>,
}

impl RecipeListParams {
    fn filter(&self) -> RecipeFilter {
        RecipeFilter {
            author_id: self.author,
            tag_slugs: self.tags.clone(),
            is_favorited: self.is_favorited.map(|flag| flag != 0),
            is_in_shopping_cart: self.is_in_shopping_cart.map(|flag| flag != 0),
        }
    }
}

/// List recipes, newest first
pub async fn list_recipes(
    State(state): State<AppState>,
    auth: AuthContext,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<RecipeListParams>,
) -> Result<Json<Page<RecipeView>>> {
    let repo = state.repo();
    let window = Window::new(&state.config, params.limit, params.offset);

    let (recipes, count) = repo
        .list_recipes(&params.filter(), auth.user_id, window.offset, window.limit)
        .await?;
    let details = repo.recipe_details(recipes, auth.user_id).await?;

    let base = format!("{}{}", state.config.server.public_url.trim_end_matches('/'), uri.path());
    let page = Page::new(details, count, window, &base, raw_query.as_deref());
    Ok(Json(page.map(recipe_view)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<Json<RecipeView>> {
    let repo = state.repo();
    let recipe = repo.get_recipe(id).await?;
    let details = repo.recipe_detail(recipe, auth.user_id).await?;
    Ok(Json(recipe_view(details)))
}

/// Create a recipe authored by the caller
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Result<JsonBody<RecipePayload>>,
) -> Result<(StatusCode, Json<RecipeView>)> {
    let user_id = auth.require_user()?;
    let JsonBody(payload) = body?;
    let repo = state.repo();

    let composition = validated(&repo, payload).await?;
    let image = state.images.store(ImageKind::Recipe, &composition.image).await?;

    let created = repo
        .create_recipe(user_id, &composition, &image.reference)
        .await;
    let recipe = match created {
        Ok(recipe) => recipe,
        Err(e) => {
            if image.fresh {
                discard_image(&state, &image.reference).await;
            }
            return Err(e);
        }
    };

    tracing::info!(
        recipe_id = recipe.id,
        author_id = user_id,
        request_id = %auth.request_id,
        "Recipe created"
    );
    metrics::record_recipe_write("create");

    let details = repo.recipe_detail(recipe, Some(user_id)).await?;
    Ok((StatusCode::CREATED, Json(recipe_view(details))))
}

/// Replace a recipe's fields, tags and ingredients; author only
pub async fn update_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    body: Result<JsonBody<RecipePayload>>,
) -> Result<Json<RecipeView>> {
    auth.require_user()?;
    let repo = state.repo();

    let existing = repo.get_recipe(id).await?;
    let user_id = auth.require_owner(existing.author_id)?;
    let JsonBody(payload) = body?;

    let composition = validated(&repo, payload).await?;
    let image = if composition.image == existing.image {
        StoredImage::kept(existing.image.clone())
    } else {
        state.images.store(ImageKind::Recipe, &composition.image).await?
    };
    let previous_image = existing.image.clone();

    let updated = match repo.update_recipe(existing, &composition, &image.reference).await {
        Ok(recipe) => recipe,
        Err(e) => {
            if image.fresh {
                discard_image(&state, &image.reference).await;
            }
            return Err(e);
        }
    };

    if image.fresh && previous_image != updated.image {
        discard_image(&state, &previous_image).await;
    }

    tracing::info!(
        recipe_id = updated.id,
        author_id = user_id,
        request_id = %auth.request_id,
        "Recipe updated"
    );
    metrics::record_recipe_write("update");

    let details = repo.recipe_detail(updated, Some(user_id)).await?;
    Ok(Json(recipe_view(details)))
}

/// Delete a recipe; author only
pub async fn delete_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    auth.require_user()?;
    let repo = state.repo();

    let recipe = repo.get_recipe(id).await?;
    auth.require_owner(recipe.author_id)?;

    repo.delete_recipe(recipe.id).await?;
    discard_image(&state, &recipe.image).await;

    tracing::info!(recipe_id = id, request_id = %auth.request_id, "Recipe deleted");
    metrics::record_recipe_write("delete");

    Ok(StatusCode::NO_CONTENT)
}

/// Absolute short link for sharing
pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ShortLinkView>> {
    let recipe = state.repo().get_recipe(id).await?;
    Ok(Json(short_link_view(&state.config.server.public_url, &recipe)))
}

/// Resolve `/s/{short_link}` to the recipe resource
pub async fn follow_short_link(
    State(state): State<AppState>,
    Path(short_link): Path<String>,
) -> Result<Redirect> {
    let recipe = state
        .repo()
        .find_recipe_by_short_link(&short_link)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe", &short_link))?;

    Ok(Redirect::to(&format!("/api/recipes/{}", recipe.id)))
}

// ============================================================================
// Favorites & Shopping Cart
// ============================================================================

pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeShortView>)> {
    let user_id = auth.require_user()?;
    let recipe = state.repo().add_favorite(user_id, id).await?;
    metrics::record_membership("favorite", "add");
    Ok(created_short(recipe))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let user_id = auth.require_user()?;
    state.repo().remove_favorite(user_id, id).await?;
    metrics::record_membership("favorite", "remove");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeShortView>)> {
    let user_id = auth.require_user()?;
    let recipe = state.repo().add_to_cart(user_id, id).await?;
    metrics::record_membership("cart", "add");
    Ok(created_short(recipe))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let user_id = auth.require_user()?;
    state.repo().remove_from_cart(user_id, id).await?;
    metrics::record_membership("cart", "remove");
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's aggregated shopping list as a plain-text attachment
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Response> {
    let user_id = auth.require_user()?;
    let list = state.repo().shopping_list(user_id).await?;
    metrics::record_shopping_list(list.len());

    tracing::debug!(user_id, entries = list.len(), "Shopping list rendered");

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME),
            ),
        ],
        list.render(),
    )
        .into_response())
}

fn created_short(recipe: Recipe) -> (StatusCode, Json<RecipeShortView>) {
    (StatusCode::CREATED, Json(recipe_short_view(recipe)))
}

async fn validated(repo: &Repository, payload: RecipePayload) -> Result<Composition> {
    let ingredient_ids: Vec<i32> = payload.ingredients.iter().map(|line| line.id).collect();
    let known = KnownReferences {
        tags: repo.existing_tag_ids(&payload.tags).await?,
        ingredients: repo.existing_ingredient_ids(&ingredient_ids).await?,
    };

    Ok(composition::validate(payload, &known)?)
}
