//! Schema creation from the entity definitions
//!
//! Tables come from `Schema::create_table_from_entity`, which carries the
//! single-column unique flags and the cascading foreign keys declared on each
//! `Relation`. Composite uniqueness and the follow CHECK live here because
//! concurrent duplicate inserts must be rejected by the store itself.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Expr, Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Schema};
use tracing::info;

/// Create every table and index that does not exist yet
pub async fn create_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    let backend = conn.get_database_backend();

    for mut table in tables(&Schema::new(backend)) {
        table.if_not_exists();
        conn.execute(backend.build(&table)).await?;
    }

    for index in unique_pairs() {
        conn.execute(backend.build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

/// Tables in foreign-key dependency order
fn tables(schema: &Schema) -> Vec<TableCreateStatement> {
    let mut follows = schema.create_table_from_entity(FollowEntity);
    follows.check(Expr::col(FollowColumn::UserId).ne(Expr::col(FollowColumn::FollowingId)));

    vec![
        schema.create_table_from_entity(UserEntity),
        schema.create_table_from_entity(IngredientEntity),
        schema.create_table_from_entity(TagEntity),
        schema.create_table_from_entity(RecipeEntity),
        schema.create_table_from_entity(RecipeIngredientEntity),
        schema.create_table_from_entity(RecipeTagEntity),
        schema.create_table_from_entity(FavoriteEntity),
        schema.create_table_from_entity(ShoppingCartEntity),
        follows,
    ]
}

fn unique_pairs() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uq_recipe_ingredients_recipe_ingredient")
            .table(RecipeIngredientEntity)
            .col(RecipeIngredientColumn::RecipeId)
            .col(RecipeIngredientColumn::IngredientId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_recipe_tags_recipe_tag")
            .table(RecipeTagEntity)
            .col(RecipeTagColumn::RecipeId)
            .col(RecipeTagColumn::TagId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_favorites_user_recipe")
            .table(FavoriteEntity)
            .col(FavoriteColumn::UserId)
            .col(FavoriteColumn::RecipeId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_shopping_cart_items_user_recipe")
            .table(ShoppingCartEntity)
            .col(ShoppingCartColumn::UserId)
            .col(ShoppingCartColumn::RecipeId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_follows_user_following")
            .table(FollowEntity)
            .col(FollowColumn::UserId)
            .col(FollowColumn::FollowingId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}
