//! Shopping Lists

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to shopping list construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShoppingListError {
    /// The list has no items.
    #[error("shopping list must contain at least one item")]
    Empty,
}

/// Shopping List
///
/// A non-empty, ordered list of distinct item names that must all be sourced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ShoppingList {
    items: Vec<String>,
}

impl ShoppingList {
    /// Create a shopping list from item names.
    ///
    /// Repeated names collapse onto their first occurrence, so the list keeps the
    /// order in which items were first named.
    ///
    /// # Errors
    ///
    /// Returns [`ShoppingListError::Empty`] if no items are given.
    pub fn new<I, S>(items: I) -> Result<Self, ShoppingListError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = FxHashSet::default();

        let items: Vec<String> = items
            .into_iter()
            .map(Into::into)
            .filter(|item| seen.insert(item.clone()))
            .collect();

        if items.is_empty() {
            return Err(ShoppingListError::Empty);
        }

        Ok(Self { items })
    }

    /// Returns `true` if the item is on the list.
    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|listed| listed == item)
    }

    /// Iterate over item names in list order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Number of items on the list.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl TryFrom<Vec<String>> for ShoppingList {
    type Error = ShoppingListError;

    fn try_from(items: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(items)
    }
}

impl From<ShoppingList> for Vec<String> {
    fn from(list: ShoppingList) -> Self {
        list.items
    }
}
