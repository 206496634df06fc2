//! Ingredient entity (reference catalogue)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const NAME_MAX_LENGTH: usize = 128;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Case-sensitive unique name
    #[sea_orm(unique, column_type = "String(StringLen::N(128))")]
    pub name: String,

    #[sea_orm(column_type = "String(StringLen::N(64))")]
    pub measurement_unit: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    RecipeIngredients,
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeIngredients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
