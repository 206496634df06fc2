//! Recipe domain rules
//!
//! Pure functions over already-fetched data; persistence lives in
//! [`crate::db::Repository`].

pub mod accounts;
pub mod composition;
pub mod shopping_list;
pub mod short_link;

pub use composition::{Composition, IngredientAmount, KnownReferences, RecipePayload};
pub use shopping_list::{ShoppingList, ShoppingListEntry};
