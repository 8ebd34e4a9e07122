// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP front end.
//!
//! The server is a thin adapter: it turns axum requests into
//! [`luasite::ScriptRequest`]s, hands them to the dispatcher on a blocking
//! thread and converts the [`luasite::HostResponse`] back.

/// HTTP server implementation using Axum.
pub mod http;

pub use http::{build_router, serve, AppState};
