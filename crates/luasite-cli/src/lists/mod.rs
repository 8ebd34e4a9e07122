// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI list store implementation using SQLite.

mod sqlite;

pub use sqlite::SqliteListStore;
