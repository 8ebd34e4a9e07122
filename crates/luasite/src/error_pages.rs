// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error-page resolution.
//!
//! Status pages are looked up in the errors directory with a fixed chain:
//!
//! 1. `<code>.html`
//! 2. `500.html`
//! 3. a built-in plaintext page naming the code
//!
//! The status of the resulting page is always the requested code, whichever
//! tier produced the body. Script failures have their own page,
//! `luaError.html`, in which the token `<$error$>` is replaced by the error
//! message; without it a built-in plaintext page is used.
//!
//! Resolution never fails. Unreadable pages are logged and skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Token replaced by the error message in `luaError.html`.
pub const ERROR_TOKEN: &str = "<$error$>";

/// File name of the script-failure page.
pub const SCRIPT_FAILURE_PAGE: &str = "luaError.html";

/// The message shown to clients for a failure.
///
/// Details are only revealed in verbose mode.
pub fn client_message(verbose: bool, detail: &str) -> String {
    if verbose {
        format!("Error: {}", detail)
    } else {
        "Error".to_string()
    }
}

/// Escapes text for insertion into HTML.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// A rendered error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    /// HTTP status code.
    pub status: u16,
    /// Content type of `body`.
    pub content_type: String,
    /// Page contents.
    pub body: String,
}

impl ErrorPage {
    fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html".to_string(),
            body,
        }
    }

    fn plain(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body,
        }
    }
}

/// Resolves status codes and script failures to error pages.
#[derive(Debug, Clone)]
pub struct ErrorPageResolver {
    errors_dir: PathBuf,
    verbose: bool,
}

impl ErrorPageResolver {
    /// Creates a resolver reading pages from `errors_dir`.
    ///
    /// With `verbose` set, error details are shown to the client.
    pub fn new(errors_dir: impl Into<PathBuf>, verbose: bool) -> Self {
        Self {
            errors_dir: errors_dir.into(),
            verbose,
        }
    }

    /// Directory the pages are read from.
    pub fn errors_dir(&self) -> &Path {
        &self.errors_dir
    }

    /// Whether error details are shown to clients.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// The client-facing message for an error detail.
    pub fn message(&self, detail: &str) -> String {
        client_message(self.verbose, detail)
    }

    /// Resolves the page for a status code.
    pub fn resolve(&self, code: u16) -> ErrorPage {
        if let Some(body) = self.read_page(&format!("{}.html", code)) {
            return ErrorPage::html(code, body);
        }
        if code != 500 {
            if let Some(body) = self.read_page("500.html") {
                return ErrorPage::html(code, body);
            }
        }
        ErrorPage::plain(
            code,
            format!(
                "No error page has been set up for this response.\nThe code was: {}",
                code
            ),
        )
    }

    /// Resolves the page for a failed script, always with status 500.
    pub fn script_failure(&self, detail: &str) -> ErrorPage {
        let message = self.message(detail);
        match self.read_page(SCRIPT_FAILURE_PAGE) {
            Some(template) => {
                ErrorPage::html(500, template.replace(ERROR_TOKEN, &html_escape(&message)))
            }
            None => ErrorPage::plain(
                500,
                format!(
                    "No error page has been set up for script failures.\nThe script for this page failed to run.\n{}",
                    message
                ),
            ),
        }
    }

    fn read_page(&self, name: &str) -> Option<String> {
        let path = self.errors_dir.join(name);
        match fs::read_to_string(&path) {
            Ok(body) => Some(body),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(page = %path.display(), error = %e, "Skipping unreadable error page");
                None
            }
        }
    }
}
