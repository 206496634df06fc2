//! API handlers module

pub mod health;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;

use crate::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

/// Routes mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalogue (read only)
        .route("/tags", get(tags::list_tags))
        .route("/tags/{id}", get(tags::get_tag))
        .route("/ingredients", get(ingredients::list_ingredients))
        .route("/ingredients/{id}", get(ingredients::get_ingredient))

        // Recipes
        .route("/recipes", get(recipes::list_recipes).post(recipes::create_recipe))
        .route(
            "/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/recipes/{id}/get-link", get(recipes::get_link))
        .route(
            "/recipes/{id}/favorite",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )

        // Users & subscriptions
        .route("/users", get(users::list_users).post(users::register))
        .route("/users/me", get(users::me))
        .route(
            "/users/me/avatar",
            put(users::set_avatar).delete(users::delete_avatar),
        )
        .route("/users/set_password", post(users::set_password))
        .route("/users/subscriptions", get(users::subscriptions))
        .route("/users/{id}", get(users::get_user))
        .route(
            "/users/{id}/subscribe",
            post(users::subscribe).delete(users::unsubscribe),
        )
}

/// Best effort; a leftover file is logged, not surfaced
pub(crate) async fn discard_image(state: &AppState, reference: &str) {
    if let Err(e) = state.images.discard(reference).await {
        tracing::warn!(error = %e, image = %reference, "Failed to discard image");
    }
}
