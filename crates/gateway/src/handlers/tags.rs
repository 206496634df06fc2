//! Tag handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::views::{tag_view, TagView};
use crate::AppState;
use foodgram_common::errors::Result;

/// All tags; the list is small and not paginated
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagView>>> {
    let tags = state.repo().list_tags().await?;
    Ok(Json(tags.into_iter().map(tag_view).collect()))
}

pub async fn get_tag(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<TagView>> {
    let tag = state.repo().get_tag(id).await?;
    Ok(Json(tag_view(tag)))
}
