// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Named shared lists.
//!
//! A shared list maps an opaque identifier to an ordered sequence of
//! strings. Lists are visible to every interpreter in the pool and survive
//! across requests; the backend decides whether they survive restarts.
//!
//! # API
//!
//! ```lua
//! api.list.appendToList("todo", "write docs")   -- "Item added to list todo"
//! local items = api.list.getListData("todo")    -- { "write docs" }
//! local first = api.list.getItem("todo", 1)     -- "write docs"
//! api.list.removeFromList("todo", "write docs") -- "Item removed from list todo"
//! api.list.deleteList("todo")                   -- "List todo deleted"
//! api.list.listExists("todo")                   -- false
//! ```
//!
//! # Implementations
//!
//! - **Library**: [`MemoryListStore`], process-local
//! - **CLI**: SQLite-backed persistent storage

mod memory;
mod register;

pub use memory::MemoryListStore;
pub use register::register_list_module;

use thiserror::Error;

/// Result type for list operations.
pub type ListResult<T> = Result<T, ListError>;

/// Error type for list operations.
#[derive(Debug, Error)]
pub enum ListError {
    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),
    /// A stored row could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ListError {
    fn from(err: serde_json::Error) -> Self {
        ListError::Serialization(err.to_string())
    }
}

/// Persistence facade for shared lists.
///
/// Every call is atomic with respect to other calls on the same store.
pub trait ListStore: Send + Sync {
    /// Returns the items of a list, creating it empty if it does not exist.
    fn get(&self, id: &str) -> ListResult<Vec<String>>;

    /// Appends an item at the tail of a list, creating the list if needed.
    fn append(&self, id: &str, item: &str) -> ListResult<()>;

    /// Removes the first item matching `item` (see [`items_match`]).
    ///
    /// Returns `false` when nothing matched.
    fn remove(&self, id: &str, item: &str) -> ListResult<bool>;

    /// Deletes a whole list. Deleting a missing list is not an error.
    fn delete(&self, id: &str) -> ListResult<()>;

    /// Returns true if the list exists.
    fn exists(&self, id: &str) -> ListResult<bool>;

    /// Removes every list.
    fn reset(&self) -> ListResult<()>;
}

/// Compares a stored item with a requested one.
///
/// Items match when their text is identical or when both parse as numbers
/// with the same value (`"3"`, `"3.0"` and `3` all match each other).
pub fn items_match(stored: &str, requested: &str) -> bool {
    if stored == requested {
        return true;
    }
    match (stored.trim().parse::<f64>(), requested.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Removes the first matching item in place.
pub(crate) fn remove_first(items: &mut Vec<String>, requested: &str) -> bool {
    match items.iter().position(|stored| items_match(stored, requested)) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_match_numeric_coercion() {
        assert!(items_match("3", "3"));
        assert!(items_match("3", "3.0"));
        assert!(items_match(" 42", "42"));
        assert!(!items_match("3", "4"));
        assert!(!items_match("apple", "Apple"));
        assert!(!items_match("nan", "NaN"));
    }

    #[test]
    fn test_remove_first_only() {
        let mut items = vec!["a".to_string(), "1".to_string(), "1".to_string()];
        assert!(remove_first(&mut items, "1.0"));
        assert_eq!(items, vec!["a".to_string(), "1".to_string()]);
        assert!(!remove_first(&mut items, "b"));
    }
}
