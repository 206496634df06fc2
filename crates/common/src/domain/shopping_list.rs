//! Shopping list aggregation
//!
//! Ingredient lines from every recipe in a cart are summed per
//! (name, measurement unit). Entries come out sorted by that key so the
//! rendered list is identical for identical carts.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListEntry {
    pub name: String,
    pub amount: i64,
    pub measurement_unit: String,
}

/// Aggregated ingredients of one cart, materialized once per read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShoppingList {
    entries: Vec<ShoppingListEntry>,
}

impl ShoppingList {
    /// Group `(name, measurement_unit, amount)` rows and sum the amounts
    pub fn aggregate<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String, i32)>,
    {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for (name, unit, amount) in rows {
            *totals.entry((name, unit)).or_insert(0) += i64::from(amount);
        }

        let entries = totals
            .into_iter()
            .map(|((name, measurement_unit), amount)| ShoppingListEntry {
                name,
                amount,
                measurement_unit,
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[ShoppingListEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShoppingListEntry> {
        self.entries.iter()
    }

    /// Plain-text report, one `"<name>: <amount>, <unit>"` line per entry
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}, {}\n", e.name, e.amount, e.measurement_unit))
            .collect()
    }
}

impl IntoIterator for ShoppingList {
    type Item = ShoppingListEntry;
    type IntoIter = std::vec::IntoIter<ShoppingListEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ShoppingList {
    type Item = &'a ShoppingListEntry;
    type IntoIter = std::slice::Iter<'a, ShoppingListEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
