// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! In-memory list store implementation.
//!
//! Used by tests and by embedders that do not need durability.

use super::{remove_first, ListError, ListResult, ListStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Process-local list store.
///
/// A single mutex serializes all operations, which gives the same
/// per-list ordering guarantee as the SQLite backend.
#[derive(Debug, Default)]
pub struct MemoryListStore {
    lists: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryListStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ListResult<MutexGuard<'_, HashMap<String, Vec<String>>>> {
        self.lists
            .lock()
            .map_err(|e| ListError::Storage(e.to_string()))
    }
}

impl ListStore for MemoryListStore {
    fn get(&self, id: &str) -> ListResult<Vec<String>> {
        let mut lists = self.lock()?;
        Ok(lists.entry(id.to_string()).or_default().clone())
    }

    fn append(&self, id: &str, item: &str) -> ListResult<()> {
        let mut lists = self.lock()?;
        lists.entry(id.to_string()).or_default().push(item.to_string());
        Ok(())
    }

    fn remove(&self, id: &str, item: &str) -> ListResult<bool> {
        let mut lists = self.lock()?;
        let items = lists.entry(id.to_string()).or_default();
        Ok(remove_first(items, item))
    }

    fn delete(&self, id: &str) -> ListResult<()> {
        let mut lists = self.lock()?;
        lists.remove(id);
        Ok(())
    }

    fn exists(&self, id: &str) -> ListResult<bool> {
        let lists = self.lock()?;
        Ok(lists.contains_key(id))
    }

    fn reset(&self) -> ListResult<()> {
        let mut lists = self.lock()?;
        lists.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_read_creates_empty_list() {
        let store = MemoryListStore::new();
        assert!(!store.exists("fresh").unwrap());
        assert!(store.get("fresh").unwrap().is_empty());
        assert!(store.exists("fresh").unwrap());
    }

    #[test]
    fn test_append_remove_delete() {
        let store = MemoryListStore::new();
        store.append("l", "x").unwrap();
        store.append("l", "y").unwrap();
        store.append("l", "x").unwrap();
        assert_eq!(store.get("l").unwrap(), vec!["x", "y", "x"]);

        assert!(store.remove("l", "x").unwrap());
        assert_eq!(store.get("l").unwrap(), vec!["y", "x"]);
        assert!(!store.remove("l", "z").unwrap());

        store.delete("l").unwrap();
        assert!(!store.exists("l").unwrap());
        assert!(store.get("l").unwrap().is_empty());
    }

    #[test]
    fn test_reset() {
        let store = MemoryListStore::new();
        store.append("a", "1").unwrap();
        store.append("b", "2").unwrap();
        store.reset().unwrap();
        assert!(!store.exists("a").unwrap());
        assert!(!store.exists("b").unwrap());
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let store = Arc::new(MemoryListStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append("shared", &format!("{}-{}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get("shared").unwrap().len(), 400);
    }
}
