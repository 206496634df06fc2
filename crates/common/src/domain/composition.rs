//! Recipe composition validation
//!
//! A candidate recipe is checked as a whole and every violation is reported,
//! keyed by field, so a client can fix all of them in one round trip.

use crate::errors::{ErrorCode, ValidationErrors};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use validator::Validate;

pub const MIN_COOKING_TIME: i64 = 1;
pub const MIN_AMOUNT: i64 = 1;
pub const RECIPE_NAME_MAX_LENGTH: u64 = 256;

/// One ingredient line as submitted by a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngredientAmountInput {
    pub id: i32,
    /// Absent amounts are reported alongside every other violation
    #[serde(default)]
    pub amount: Option<i64>,
}

/// Recipe create/update payload before validation
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecipePayload {
    #[serde(default)]
    #[validate(length(max = 256, message = "recipe name is limited to 256 characters"))]
    pub name: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub cooking_time: Option<i64>,

    /// Base64 data URL or an existing image reference
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub tags: Vec<i32>,

    #[serde(default)]
    pub ingredients: Vec<IngredientAmountInput>,
}

/// Ids that exist in the catalogue, looked up read-only by the caller
#[derive(Debug, Clone, Default)]
pub struct KnownReferences {
    pub tags: HashSet<i32>,
    pub ingredients: HashSet<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: i32,
    pub amount: i32,
}

/// A payload that passed every rule; tag and ingredient order is preserved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
    pub tag_ids: Vec<i32>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Validate `payload` against the catalogue
pub fn validate(
    payload: RecipePayload,
    known: &KnownReferences,
) -> Result<Composition, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let Err(e) = payload.validate() {
        errors.merge_validator(&e);
    }

    if payload.name.trim().is_empty() {
        errors.add("name", ErrorCode::MissingField, "recipe name is required");
    }
    if payload.text.trim().is_empty() {
        errors.add("text", ErrorCode::MissingField, "recipe description is required");
    }

    let cooking_time = match payload.cooking_time {
        None => {
            errors.add("cooking_time", ErrorCode::InvalidQuantity, "cooking time is required");
            None
        }
        Some(minutes) => match positive_i32(minutes, MIN_COOKING_TIME) {
            Some(minutes) => Some(minutes),
            None => {
                errors.add(
                    "cooking_time",
                    ErrorCode::InvalidQuantity,
                    format!("cooking time must be at least {} minute", MIN_COOKING_TIME),
                );
                None
            }
        },
    };

    check_tags(&payload.tags, known, &mut errors);

    let image = payload
        .image
        .filter(|image| !image.trim().is_empty());
    if image.is_none() {
        errors.add("image", ErrorCode::MissingField, "recipe image is required");
    }

    let ingredients = check_ingredients(&payload.ingredients, known, &mut errors);

    match (cooking_time, image) {
        (Some(cooking_time), Some(image)) if errors.is_empty() => Ok(Composition {
            name: payload.name.trim().to_string(),
            text: payload.text,
            cooking_time,
            image,
            tag_ids: payload.tags,
            ingredients,
        }),
        _ => Err(errors),
    }
}

fn check_tags(tags: &[i32], known: &KnownReferences, errors: &mut ValidationErrors) {
    if tags.is_empty() {
        errors.add("tags", ErrorCode::MissingField, "at least one tag is required");
        return;
    }

    let repeated = repeated(tags.iter().copied());
    if !repeated.is_empty() {
        errors.add(
            "tags",
            ErrorCode::DuplicateReference,
            format!("tags must be unique, repeated: {}", join_ids(&repeated)),
        );
    }

    let unknown: BTreeSet<i32> = tags
        .iter()
        .copied()
        .filter(|id| !known.tags.contains(id))
        .collect();
    if !unknown.is_empty() {
        errors.add(
            "tags",
            ErrorCode::UnknownReference,
            format!("unknown tags: {}", join_ids(&unknown)),
        );
    }
}

fn check_ingredients(
    lines: &[IngredientAmountInput],
    known: &KnownReferences,
    errors: &mut ValidationErrors,
) -> Vec<IngredientAmount> {
    if lines.is_empty() {
        errors.add("ingredients", ErrorCode::MissingField, "at least one ingredient is required");
        return Vec::new();
    }

    let repeated = repeated(lines.iter().map(|line| line.id));
    if !repeated.is_empty() {
        errors.add(
            "ingredients",
            ErrorCode::DuplicateReference,
            format!("ingredients must be unique, repeated: {}", join_ids(&repeated)),
        );
    }

    let mut accepted = Vec::with_capacity(lines.len());
    for line in lines {
        let amount = line.amount.and_then(|amount| positive_i32(amount, MIN_AMOUNT));
        if amount.is_none() {
            errors.add(
                "ingredients",
                ErrorCode::InvalidQuantity,
                format!("amount of ingredient {} must be at least {}", line.id, MIN_AMOUNT),
            );
        }
        if !known.ingredients.contains(&line.id) {
            errors.add(
                "ingredients",
                ErrorCode::UnknownReference,
                format!("unknown ingredient: {}", line.id),
            );
        }
        if let Some(amount) = amount {
            accepted.push(IngredientAmount {
                ingredient_id: line.id,
                amount,
            });
        }
    }
    accepted
}

/// `value` as an i32 no smaller than `min`
fn positive_i32(value: i64, min: i64) -> Option<i32> {
    if value < min {
        return None;
    }
    i32::try_from(value).ok()
}

fn repeated(ids: impl IntoIterator<Item = i32>) -> BTreeSet<i32> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| !seen.insert(*id)).collect()
}

fn join_ids(ids: &BTreeSet<i32>) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> KnownReferences {
        KnownReferences {
            tags: [1, 2, 3].into_iter().collect(),
            ingredients: [1, 2, 3, 4].into_iter().collect(),
        }
    }

    fn payload() -> RecipePayload {
        RecipePayload {
            name: "Pancakes".into(),
            text: "Mix and fry.".into(),
            cooking_time: Some(20),
            image: Some("data:image/png;base64,iVBORw0KGgo=".into()),
            tags: vec![2, 1],
            ingredients: vec![
                IngredientAmountInput { id: 3, amount: Some(200) },
                IngredientAmountInput { id: 1, amount: Some(2) },
            ],
        }
    }

    #[test]
    fn test_valid_payload_keeps_order() {
        let composition = validate(payload(), &known()).unwrap();
        assert_eq!(composition.cooking_time, 20);
        assert_eq!(composition.tag_ids, vec![2, 1]);
        assert_eq!(
            composition.ingredients,
            vec![
                IngredientAmount { ingredient_id: 3, amount: 200 },
                IngredientAmount { ingredient_id: 1, amount: 2 },
            ]
        );
    }

    #[test]
    fn test_all_violations_reported_together() {
        let mut bad = payload();
        bad.cooking_time = Some(0);
        bad.tags = vec![];
        bad.ingredients = vec![];

        let errors = validate(bad, &known()).unwrap_err();
        assert!(errors.has("cooking_time", ErrorCode::InvalidQuantity));
        assert!(errors.has("tags", ErrorCode::MissingField));
        assert!(errors.has("ingredients", ErrorCode::MissingField));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_duplicate_ingredients_rejected() {
        let mut bad = payload();
        bad.ingredients = vec![
            IngredientAmountInput { id: 1, amount: Some(5) },
            IngredientAmountInput { id: 1, amount: Some(3) },
        ];

        let errors = validate(bad, &known()).unwrap_err();
        assert!(errors.has("ingredients", ErrorCode::DuplicateReference));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_duplicate_and_unknown_tags() {
        let mut bad = payload();
        bad.tags = vec![1, 1, 9];

        let errors = validate(bad, &known()).unwrap_err();
        assert!(errors.has("tags", ErrorCode::DuplicateReference));
        assert!(errors.has("tags", ErrorCode::UnknownReference));
    }

    #[test]
    fn test_ingredient_amount_and_reference() {
        let mut bad = payload();
        bad.ingredients = vec![
            IngredientAmountInput { id: 1, amount: Some(0) },
            IngredientAmountInput { id: 42, amount: Some(3) },
            IngredientAmountInput { id: 2, amount: Some(i64::from(i32::MAX) + 1) },
        ];

        let errors = validate(bad, &known()).unwrap_err();
        let kinds: Vec<ErrorCode> = errors.field("ingredients").iter().map(|e| e.code).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorCode::InvalidQuantity,
                ErrorCode::UnknownReference,
                ErrorCode::InvalidQuantity,
            ]
        );
    }

    #[test]
    fn test_missing_amount_is_invalid_quantity() {
        let parsed: RecipePayload = serde_json::from_str(
            r#"{"name": "Tea", "text": "Brew", "cooking_time": 3, "image": "data:x",
                "tags": [1], "ingredients": [{"id": 1}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.ingredients[0].amount, None);

        let errors = validate(parsed, &known()).unwrap_err();
        assert!(errors.has("ingredients", ErrorCode::InvalidQuantity));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_missing_cooking_time_and_image() {
        let mut bad = payload();
        bad.cooking_time = None;
        bad.image = Some("   ".into());

        let errors = validate(bad, &known()).unwrap_err();
        assert!(errors.has("cooking_time", ErrorCode::InvalidQuantity));
        assert!(errors.has("image", ErrorCode::MissingField));
    }

    #[test]
    fn test_name_and_text() {
        let mut bad = payload();
        bad.name = "x".repeat(257);
        bad.text = String::new();

        let errors = validate(bad, &known()).unwrap_err();
        assert!(errors.has("name", ErrorCode::InvalidFormat));
        assert!(errors.has("text", ErrorCode::MissingField));
    }

    #[test]
    fn test_payload_defaults_from_json() {
        let parsed: RecipePayload = serde_json::from_str(r#"{"cooking_time": 0}"#).unwrap();
        assert!(parsed.tags.is_empty());
        assert!(parsed.image.is_none());
        let errors = validate(parsed, &known()).unwrap_err();
        assert!(errors.has("image", ErrorCode::MissingField));
    }
}
