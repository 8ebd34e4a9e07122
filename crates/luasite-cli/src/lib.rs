// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! luasite CLI library.
//!
//! This crate wires the [`luasite`] host to the outside world: it reads
//! `luasite.toml`, keeps shared lists in SQLite, gives scripts an outbound
//! HTTP client and serves the site with axum.
//!
//! # Usage
//!
//! This crate is primarily used through the `luasite` binary:
//!
//! ```bash
//! luasite init my-site   # Scaffold a new site
//! luasite serve          # Serve the site in the current directory
//! ```
//!
//! # Configuration
//!
//! Sites are configured via `luasite.toml` at the project root.

/// CLI commands (init, serve).
pub mod commands;
/// Site configuration from `luasite.toml`.
pub mod config;
/// CLI-specific Lua extensions (http client).
pub mod extensions;
/// SQLite-backed shared lists.
pub mod lists;
/// HTTP front end.
pub mod server;
