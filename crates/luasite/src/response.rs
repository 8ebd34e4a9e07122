// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Transport-agnostic response produced by the dispatcher.
//!
//! Adapters (the axum server in `luasite-cli`, tests) convert a
//! [`HostResponse`] into their own response type.

use std::collections::HashMap;

use crate::error_pages::ErrorPage;

/// A response produced for one request.
///
/// # Example
///
/// ```rust
/// use luasite::HostResponse;
///
/// let page = HostResponse::html(200, "<h1>Hello</h1>");
/// assert_eq!(page.status(), 200);
///
/// let moved = HostResponse::redirect("/login");
/// assert_eq!(moved.status(), 302);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum HostResponse {
    /// A response with a body.
    Content {
        /// HTTP status code
        status: u16,
        /// Value of the Content-Type header
        content_type: String,
        /// Additional headers set by the script
        headers: HashMap<String, String>,
        /// Response body
        body: Vec<u8>,
    },

    /// Redirect response
    Redirect {
        /// HTTP status code (302 unless built otherwise)
        status: u16,
        /// Redirect location
        location: String,
    },
}

impl HostResponse {
    /// Creates a response with the given content type and body.
    pub fn content(status: u16, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::Content {
            status,
            content_type: content_type.into(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Creates an HTML response.
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::content(status, "text/html", body.into())
    }

    /// Creates a redirect response (HTTP 302).
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            status: 302,
            location: location.into(),
        }
    }

    /// Returns the status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::Content { status, .. } => *status,
            Self::Redirect { status, .. } => *status,
        }
    }

    /// Returns the body, empty for redirects.
    pub fn body(&self) -> &[u8] {
        match self {
            Self::Content { body, .. } => body,
            Self::Redirect { .. } => &[],
        }
    }

    /// Returns the body as text (lossy).
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    /// Returns the content type, if this response has a body.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Content { content_type, .. } => Some(content_type),
            Self::Redirect { .. } => None,
        }
    }
}

impl From<ErrorPage> for HostResponse {
    fn from(page: ErrorPage) -> Self {
        Self::content(page.status, page.content_type, page.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_response() {
        let resp = HostResponse::html(200, "<h1>Hello</h1>");
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.content_type(), Some("text/html"));
        assert_eq!(resp.body_text(), "<h1>Hello</h1>");
    }

    #[test]
    fn test_redirect() {
        let resp = HostResponse::redirect("/login");
        assert_eq!(resp.status(), 302);
        assert!(resp.body().is_empty());
        assert_eq!(resp.content_type(), None);

        if let HostResponse::Redirect { location, .. } = resp {
            assert_eq!(location, "/login");
        } else {
            panic!("Expected Redirect variant");
        }
    }

    #[test]
    fn test_from_error_page() {
        let page = ErrorPage {
            status: 404,
            content_type: "text/plain".to_string(),
            body: "missing".to_string(),
        };
        let resp = HostResponse::from(page);
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.body_text(), "missing");
    }
}
