// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Request value handed to route scripts.
//!
//! A [`ScriptRequest`] is built once per incoming request by the transport
//! adapter and passed by reference into the interpreter, where it is
//! marshaled into a fresh Lua table. Guest code only ever sees that copy.

use std::collections::HashMap;

/// A platform-agnostic request as seen by route scripts.
///
/// # Example
///
/// ```rust
/// use luasite::ScriptRequest;
///
/// let request = ScriptRequest::new("/search", "GET")
///     .with_query_string("q=lua&page=2");
/// assert_eq!(request.query.get("page"), Some(&"2".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    /// The request path (e.g. "/blog/hello").
    pub path: String,

    /// The HTTP method (e.g. "GET", "POST").
    pub method: String,

    /// HTTP headers.
    pub headers: HashMap<String, String>,

    /// Query parameters; a repeated key keeps its last value.
    pub query: HashMap<String, String>,

    /// Query parameters with every value of a repeated key, in order.
    pub query_all: HashMap<String, Vec<String>>,

    /// Request body (for POST/PUT/PATCH).
    pub body: Option<Vec<u8>>,
}

impl ScriptRequest {
    /// Creates a new request with the given path and method.
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            headers: HashMap::new(),
            query: HashMap::new(),
            query_all: HashMap::new(),
            body: None,
        }
    }

    /// Adds headers to the request.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Parses a raw (undecoded) query string into the query maps.
    pub fn with_query_string(mut self, query_string: &str) -> Self {
        self.query.clear();
        self.query_all.clear();
        for (key, value) in form_urlencoded::parse(query_string.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            self.query_all
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
            self.query.insert(key.into_owned(), value.into_owned());
        }
        self
    }

    /// Adds a body to the request. Empty bodies are dropped.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = if body.is_empty() { None } else { Some(body) };
        self
    }

    /// Returns the body as a string, if present and valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Returns the Content-Type header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the decoded form fields when the body is URL-encoded.
    pub fn form(&self) -> Option<HashMap<String, String>> {
        let is_form = self
            .content_type()
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if !is_form {
            return None;
        }
        let body = self.body.as_deref()?;
        Some(form_urlencoded::parse(body).into_owned().collect())
    }
}

impl Default for ScriptRequest {
    fn default() -> Self {
        Self::new("/", "GET")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request() {
        let req = ScriptRequest::new("/blog/hello", "GET");
        assert_eq!(req.path, "/blog/hello");
        assert_eq!(req.method, "GET");
        assert!(req.body.is_none());
    }

    #[test]
    fn test_repeated_query_keys() {
        let req = ScriptRequest::new("/", "GET").with_query_string("tag=a&tag=b&x=%20y");
        assert_eq!(req.query.get("tag"), Some(&"b".to_string()));
        assert_eq!(
            req.query_all.get("tag"),
            Some(&vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(req.query.get("x"), Some(&" y".to_string()));
    }

    #[test]
    fn test_empty_body_is_none() {
        let req = ScriptRequest::new("/", "POST").with_body(Vec::new());
        assert!(req.body.is_none());
    }

    #[test]
    fn test_form_body() {
        let req = ScriptRequest::new("/form", "POST")
            .with_headers([("Content-Type".into(), "application/x-www-form-urlencoded".into())].into())
            .with_body(b"name=Ada+L&age=36".to_vec());
        let form = req.form().unwrap();
        assert_eq!(form.get("name"), Some(&"Ada L".to_string()));
        assert_eq!(form.get("age"), Some(&"36".to_string()));
    }

    #[test]
    fn test_form_requires_content_type() {
        let req = ScriptRequest::new("/form", "POST").with_body(b"a=1".to_vec());
        assert!(req.form().is_none());
        assert_eq!(req.body_str(), Some("a=1"));
    }
}
