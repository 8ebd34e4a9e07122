// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! SQLite-backed list store implementation.

use luasite::lists::{items_match, ListError, ListResult, ListStore};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// File name of the list database inside the data directory.
pub const DATABASE_FILE: &str = "lists.db";

/// SQLite-backed list store.
///
/// Each list is one row holding its items as a JSON array. One connection
/// serves every interpreter; each operation runs in its own transaction.
pub struct SqliteListStore {
    conn: Mutex<Connection>,
}

fn storage(e: rusqlite::Error) -> ListError {
    ListError::Storage(e.to_string())
}

impl SqliteListStore {
    /// Opens (or creates) `data_dir/lists.db`.
    pub fn open(data_dir: &Path) -> ListResult<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| ListError::Storage(format!("Failed to create data directory: {}", e)))?;

        let conn = Connection::open(data_dir.join(DATABASE_FILE))
            .map_err(|e| ListError::Storage(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> ListResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> ListResult<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS lists (
                id TEXT PRIMARY KEY NOT NULL,
                items TEXT NOT NULL
            )
            "#,
            [],
        )
        .map_err(|e| ListError::Storage(format!("Failed to create table: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> ListResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ListError::Storage(e.to_string()))
    }

    /// Reads a list inside `tx`, creating it empty when missing.
    fn load(tx: &Transaction<'_>, id: &str) -> ListResult<Vec<String>> {
        let row: Option<String> = tx
            .query_row("SELECT items FROM lists WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage)?;

        match row {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => {
                tx.execute(
                    "INSERT INTO lists (id, items) VALUES (?1, '[]')",
                    params![id],
                )
                .map_err(storage)?;
                Ok(Vec::new())
            }
        }
    }

    fn store(tx: &Transaction<'_>, id: &str, items: &[String]) -> ListResult<()> {
        let json = serde_json::to_string(items)?;
        tx.execute(
            "UPDATE lists SET items = ?2 WHERE id = ?1",
            params![id, json],
        )
        .map_err(storage)?;
        Ok(())
    }

    /// Runs `f` in a transaction and commits it.
    fn transact<T>(&self, f: impl FnOnce(&Transaction<'_>) -> ListResult<T>) -> ListResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage)?;
        let value = f(&tx)?;
        tx.commit().map_err(storage)?;
        Ok(value)
    }
}

impl ListStore for SqliteListStore {
    fn get(&self, id: &str) -> ListResult<Vec<String>> {
        self.transact(|tx| Self::load(tx, id))
    }

    fn append(&self, id: &str, item: &str) -> ListResult<()> {
        self.transact(|tx| {
            let mut items = Self::load(tx, id)?;
            items.push(item.to_string());
            Self::store(tx, id, &items)
        })
    }

    fn remove(&self, id: &str, item: &str) -> ListResult<bool> {
        self.transact(|tx| {
            let mut items = Self::load(tx, id)?;
            match items.iter().position(|stored| items_match(stored, item)) {
                Some(index) => {
                    items.remove(index);
                    Self::store(tx, id, &items)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete(&self, id: &str) -> ListResult<()> {
        self.transact(|tx| {
            tx.execute("DELETE FROM lists WHERE id = ?1", params![id])
                .map_err(storage)?;
            Ok(())
        })
    }

    fn exists(&self, id: &str) -> ListResult<bool> {
        self.transact(|tx| {
            tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM lists WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )
            .map_err(storage)
        })
    }

    fn reset(&self) -> ListResult<()> {
        self.transact(|tx| {
            tx.execute("DELETE FROM lists", []).map_err(storage)?;
            Ok(())
        })
    }
}
