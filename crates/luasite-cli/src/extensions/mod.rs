// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Capabilities that need the CLI's network stack.

/// Outbound HTTP (`api.http`).
pub mod http;

pub use http::{http_hook, register_http_module};
