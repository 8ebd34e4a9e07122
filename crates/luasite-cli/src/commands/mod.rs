// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `init`: scaffold a new site
//! - `serve`: serve a site over HTTP

/// Project initialization command.
pub mod init;
/// HTTP server command.
pub mod serve;
