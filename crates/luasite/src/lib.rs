// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # luasite
//!
//! Filesystem-routed Lua scripting host.
//!
//! Requests are mapped onto files under a `routes/` directory. Lua route
//! scripts run inside a pooled interpreter that carries the host's `api`
//! table, `.shtml` files get their `<$lua ... <$>` regions executed inline,
//! and everything else is served as a static file. Failures degrade through
//! a layered error-page chain that always ends in a response.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use luasite::{Dispatcher, HostOptions, ScriptRequest};
//! use luasite::lists::MemoryListStore;
//! use std::sync::Arc;
//!
//! let options = HostOptions::new("./routes", "./modules");
//! let dispatcher = Dispatcher::open(options, Arc::new(MemoryListStore::new()), Vec::new())?;
//!
//! let response = dispatcher.dispatch(ScriptRequest::new("/", "GET"));
//! ```

/// Request dispatching (routing, execution, fallbacks).
pub mod dispatcher;
/// Error-page resolution with layered fallbacks.
pub mod error_pages;
/// Error types.
pub mod error;
/// Host capabilities exposed to Lua (`api.*`).
pub mod extensions;
/// Named shared lists with a pluggable persistence backend.
pub mod lists;
/// Module discovery and the `require` override.
pub mod modules;
/// Pool of independent interpreter contexts.
pub mod pool;
/// Request value handed to route scripts.
pub mod request;
/// Transport-agnostic response produced by the dispatcher.
pub mod response;
/// Filesystem route resolution.
pub mod router;
/// Route script execution and result decoding.
pub mod runtime;
/// Inline `<$lua ... <$>` tag processing.
pub mod tags;

pub use dispatcher::{Dispatcher, HostOptions};
pub use error::{HostError, Result};
pub use error_pages::{ErrorPage, ErrorPageResolver};
pub use modules::{install_import_hook, ImportResolver, ModuleSet};
pub use pool::{Interpreter, InterpreterBuilder, InterpreterPool, PoolConfig, PoolError, SetupHook};
pub use request::ScriptRequest;
pub use response::HostResponse;
pub use router::{RouteDecision, RouteResolver};
pub use runtime::{ScriptError, ScriptResult};
pub use tags::TagProcessor;

// Re-export mlua so hooks can be written without a direct dependency
pub use mlua;
