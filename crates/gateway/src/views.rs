//! Response shapes
//!
//! One function per use case picks the representation of a model;
//! handlers never serialize entities directly.

use foodgram_common::db::models::{Ingredient, Recipe, Tag, User};
use foodgram_common::db::{AuthorSummary, IngredientLine, RecipeDetails, UserProfile};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TagView {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct IngredientView {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

/// Returned once, right after registration
#[derive(Debug, Serialize)]
pub struct CreatedUserView {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: i32,
    pub author: UserView,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub tags: Vec<TagView>,
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Compact recipe for favorites, cart and subscription listings
#[derive(Debug, Serialize)]
pub struct RecipeShortView {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeShortView>,
    pub recipes_count: u64,
}

#[derive(Debug, Serialize)]
pub struct AvatarView {
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct ShortLinkView {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

pub fn tag_view(tag: Tag) -> TagView {
    TagView {
        id: tag.id,
        name: tag.name,
        slug: tag.slug,
    }
}

pub fn ingredient_view(ingredient: Ingredient) -> IngredientView {
    IngredientView {
        id: ingredient.id,
        name: ingredient.name,
        measurement_unit: ingredient.measurement_unit,
    }
}

pub fn user_view(profile: UserProfile) -> UserView {
    let UserProfile {
        user,
        is_subscribed,
    } = profile;
    UserView {
        id: user.id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
        avatar: user.avatar,
    }
}

pub fn created_user_view(user: User) -> CreatedUserView {
    CreatedUserView {
        id: user.id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
    }
}

pub fn recipe_view(details: RecipeDetails) -> RecipeView {
    let RecipeDetails {
        recipe,
        author,
        tags,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
    } = details;

    RecipeView {
        id: recipe.id,
        author: user_view(author),
        name: recipe.name,
        text: recipe.text,
        image: recipe.image,
        cooking_time: recipe.cooking_time,
        tags: tags.into_iter().map(tag_view).collect(),
        ingredients,
        is_favorited,
        is_in_shopping_cart,
    }
}

pub fn recipe_short_view(recipe: Recipe) -> RecipeShortView {
    RecipeShortView {
        id: recipe.id,
        name: recipe.name,
        image: recipe.image,
        cooking_time: recipe.cooking_time,
    }
}

pub fn subscription_view(summary: AuthorSummary) -> SubscriptionView {
    SubscriptionView {
        user: user_view(summary.profile),
        recipes: summary.recipes.into_iter().map(recipe_short_view).collect(),
        recipes_count: summary.recipes_count,
    }
}

pub fn short_link_view(public_url: &str, recipe: &Recipe) -> ShortLinkView {
    ShortLinkView {
        short_link: format!("{}/s/{}", public_url.trim_end_matches('/'), recipe.short_link),
    }
}
