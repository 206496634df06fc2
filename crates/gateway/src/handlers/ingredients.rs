//! Ingredient handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::views::{ingredient_view, IngredientView};
use crate::AppState;
use foodgram_common::errors::Result;

#[derive(Debug, Default, Deserialize)]
pub struct IngredientSearch {
    /// Case-insensitive name prefix
    pub name: Option<String>,
}

/// Ingredients ordered by name, not paginated
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(search): Query<IngredientSearch>,
) -> Result<Json<Vec<IngredientView>>> {
    let ingredients = state
        .repo()
        .list_ingredients(search.name.as_deref().map(str::trim))
        .await?;
    Ok(Json(ingredients.into_iter().map(ingredient_view).collect()))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<IngredientView>> {
    let ingredient = state.repo().get_ingredient(id).await?;
    Ok(Json(ingredient_view(ingredient)))
}
