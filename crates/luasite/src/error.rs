// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the luasite host.
//!
//! [`HostError`] covers failures that reach the embedding application:
//! startup problems (module compilation, bootstrap), interpreter
//! construction, pool exhaustion and list-store failures.
//!
//! Failures that happen *inside* a request never surface here. Guest
//! errors become a [`ScriptResult::Error`](crate::ScriptResult) and are
//! rendered through the error-page chain; capability failures are handed
//! back to the guest as `nil, message`.

use std::path::PathBuf;

use thiserror::Error;

use crate::lists::ListError;
use crate::pool::PoolError;

/// The main error type for host operations.
#[derive(Error, Debug)]
pub enum HostError {
    /// Lua runtime error outside of a guest request (setup, registration).
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A module file failed to compile.
    #[error("Failed to compile module '{name}' ({}): {source}", path.display())]
    ModuleCompile {
        /// Module name (file stem).
        name: String,
        /// Path of the module file.
        path: PathBuf,
        /// The underlying compile error.
        source: mlua::Error,
    },

    /// The bootstrap module `_` raised an error.
    #[error("Bootstrap module failed: {0}")]
    Bootstrap(String),

    /// Interpreter pool failure.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Shared list store failure.
    #[error(transparent)]
    List(#[from] ListError),
}

/// Convenience type alias for Results with [`HostError`].
pub type Result<T> = std::result::Result<T, HostError>;
