//! User and subscription handlers

use axum::{
    extract::{OriginalUri, Path, Query, RawQuery, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::discard_image;
use crate::extract::JsonBody;
use crate::pagination::{Page, Window};
use crate::views::{
    created_user_view, subscription_view, user_view, AvatarView, CreatedUserView,
    SubscriptionView, UserView,
};
use crate::AppState;
use foodgram_common::{
    auth::{hash_password, verify_password, AuthContext},
    db::models::User,
    domain::accounts::{RegistrationPayload, SetPasswordPayload},
    errors::{AppError, ErrorCode, Result, ValidationErrors},
    media::ImageKind,
    metrics, Repository,
};

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Recipes shown per author
    pub recipes_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimit {
    pub recipes_limit: Option<usize>,
}

/// `PUT /users/me/avatar` body: a base64 data URL
#[derive(Debug, Default, Deserialize)]
pub struct AvatarPayload {
    #[serde(default)]
    pub avatar: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<UserView>>> {
    let repo = state.repo();
    let window = Window::new(&state.config, params.limit, params.offset);

    let (users, count) = repo.list_users(window.offset, window.limit).await?;
    let profiles = repo.user_profiles(users, auth.user_id).await?;

    let base = format!("{}{}", state.config.server.public_url.trim_end_matches('/'), uri.path());
    let page = Page::new(profiles, count, window, &base, raw_query.as_deref());
    Ok(Json(page.map(user_view)))
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegistrationPayload>,
) -> Result<(StatusCode, Json<CreatedUserView>)> {
    payload.check()?;

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .repo()
        .create_user(
            payload.email,
            payload.username,
            payload.first_name,
            payload.last_name,
            password_hash,
        )
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(created_user_view(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<Json<UserView>> {
    let repo = state.repo();
    let user = repo.get_user(id).await?;
    let profile = repo.user_profile(user, auth.user_id).await?;
    Ok(Json(user_view(profile)))
}

/// The caller's own profile
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> Result<Json<UserView>> {
    let user_id = auth.require_user()?;
    let repo = state.repo();

    let user = current_user(&repo, user_id).await?;
    let profile = repo.user_profile(user, Some(user_id)).await?;
    Ok(Json(user_view(profile)))
}

pub async fn set_password(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Result<JsonBody<SetPasswordPayload>>,
) -> Result<StatusCode> {
    let user_id = auth.require_user()?;
    let JsonBody(payload) = body?;
    payload.check()?;

    let repo = state.repo();
    let user = current_user(&repo, user_id).await?;

    if !verify_password(&payload.current_password, &user.password_hash) {
        return Err(ValidationErrors::single(
            "current_password",
            ErrorCode::InvalidFormat,
            "current password is incorrect",
        )
        .into());
    }

    let password_hash = hash_password(&payload.new_password)?;
    repo.set_password_hash(user, password_hash).await?;

    tracing::info!(user_id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the caller's avatar with an uploaded image
pub async fn set_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Result<JsonBody<AvatarPayload>>,
) -> Result<Json<AvatarView>> {
    let user_id = auth.require_user()?;
    let JsonBody(payload) = body?;
    let upload = payload
        .avatar
        .filter(|avatar| !avatar.trim().is_empty())
        .ok_or_else(|| ValidationErrors::single("avatar", ErrorCode::MissingField, "avatar is required"))?;

    let repo = state.repo();
    let user = current_user(&repo, user_id).await?;
    let previous = user.avatar.clone();

    let stored = state.images.store(ImageKind::Avatar, &upload).await?;
    if let Err(e) = repo.set_avatar(user, Some(stored.reference.clone())).await {
        discard_image(&state, &stored.reference).await;
        return Err(e);
    }
    if let Some(previous) = previous {
        discard_image(&state, &previous).await;
    }

    tracing::info!(user_id, "Avatar updated");
    Ok(Json(AvatarView {
        avatar: stored.reference,
    }))
}

pub async fn delete_avatar(State(state): State<AppState>, auth: AuthContext) -> Result<StatusCode> {
    let user_id = auth.require_user()?;
    let repo = state.repo();

    let user = current_user(&repo, user_id).await?;
    let Some(previous) = user.avatar.clone() else {
        return Err(ValidationErrors::single("avatar", ErrorCode::MissingField, "no avatar to delete").into());
    };

    repo.set_avatar(user, None).await?;
    discard_image(&state, &previous).await;

    tracing::info!(user_id, "Avatar removed");
    Ok(StatusCode::NO_CONTENT)
}

/// The account behind a token; a valid token for a deleted account is unauthenticated
async fn current_user(repo: &Repository, user_id: i32) -> Result<User> {
    repo.find_user(user_id)
        .await?
        .ok_or_else(AppError::unauthenticated)
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Authors the caller follows, each with their newest recipes
pub async fn subscriptions(
    State(state): State<AppState>,
    auth: AuthContext,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw_query): RawQuery,
    Query(params): Query<SubscriptionParams>,
) -> Result<Json<Page<SubscriptionView>>> {
    let user_id = auth.require_user()?;
    let repo = state.repo();
    let window = Window::new(&state.config, params.limit, params.offset);

    let (authors, count) = repo
        .subscriptions(user_id, window.offset, window.limit)
        .await?;
    let summaries = repo
        .author_summaries(authors, Some(user_id), params.recipes_limit)
        .await?;

    let base = format!("{}{}", state.config.server.public_url.trim_end_matches('/'), uri.path());
    let page = Page::new(summaries, count, window, &base, raw_query.as_deref());
    Ok(Json(page.map(subscription_view)))
}

pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Query(params): Query<RecipesLimit>,
) -> Result<(StatusCode, Json<SubscriptionView>)> {
    let user_id = auth.require_user()?;
    let repo = state.repo();

    let author = repo.follow(user_id, id).await?;
    metrics::record_membership("follow", "add");

    let summary = repo
        .author_summaries(vec![author], Some(user_id), params.recipes_limit)
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("User", id))?;

    Ok((StatusCode::CREATED, Json(subscription_view(summary))))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let user_id = auth.require_user()?;
    state.repo().unfollow(user_id, id).await?;
    metrics::record_membership("follow", "remove");
    Ok(StatusCode::NO_CONTENT)
}
