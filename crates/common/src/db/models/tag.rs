//! Tag entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const NAME_MAX_LENGTH: usize = 32;
pub const SLUG_MAX_LENGTH: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique, column_type = "String(StringLen::N(32))")]
    pub name: String,

    /// Stable external identifier used by list filters
    #[sea_orm(unique, column_type = "String(StringLen::N(32))")]
    pub slug: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recipe_tag::Entity")]
    RecipeTags,
}

impl Related<super::recipe_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
