// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Filesystem routing.
//!
//! A request path `p` (leading `/` removed, percent-decoded) is matched
//! against the routes directory in this order:
//!
//! 1. `p/_.lua` → directory-index script
//! 2. `p.lua` → script
//! 3. `p`, when it ends in `.shtml` → markup with inline Lua tags
//! 4. `p` → static file, content type guessed from the extension
//!
//! The empty path only maps to `_.lua`. Nothing is cached: every call looks
//! at the filesystem again. Paths that could leave the routes directory
//! (`..` segments, NUL bytes, symlinks pointing outside) resolve to
//! [`RouteDecision::NotFound`].

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::debug;

/// File name of directory-index scripts.
pub const INDEX_SCRIPT: &str = "_.lua";

/// What a request path resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// A Lua route script.
    Script(PathBuf),
    /// A `.shtml` document to run through the tag processor.
    Markup(PathBuf),
    /// A file served verbatim.
    StaticFile {
        /// File to serve.
        path: PathBuf,
        /// Guessed content type.
        content_type: &'static str,
    },
    /// Nothing matched.
    NotFound,
}

/// Maps request paths onto files in a routes directory.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    routes_dir: PathBuf,
}

impl RouteResolver {
    /// Creates a resolver rooted at `routes_dir`.
    pub fn new(routes_dir: impl Into<PathBuf>) -> Self {
        Self {
            routes_dir: routes_dir.into(),
        }
    }

    /// The routes directory.
    pub fn routes_dir(&self) -> &Path {
        &self.routes_dir
    }

    /// Resolves a request path.
    pub fn resolve(&self, path: &str) -> RouteDecision {
        let Some(relative) = sanitize(path) else {
            debug!(path, "Rejected request path");
            return RouteDecision::NotFound;
        };

        if relative.is_empty() {
            return match self.confined(&self.routes_dir.join(INDEX_SCRIPT)) {
                Some(script) => RouteDecision::Script(script),
                None => RouteDecision::NotFound,
            };
        }

        let base = self.routes_dir.join(&relative);

        if let Some(script) = self.confined(&base.join(INDEX_SCRIPT)) {
            return RouteDecision::Script(script);
        }

        if let Some(script) = self.confined(&self.routes_dir.join(format!("{}.lua", relative))) {
            return RouteDecision::Script(script);
        }

        if let Some(file) = self.confined(&base) {
            if relative.ends_with(".shtml") {
                return RouteDecision::Markup(file);
            }
            let content_type = content_type_for(&file);
            return RouteDecision::StaticFile {
                path: file,
                content_type,
            };
        }

        RouteDecision::NotFound
    }

    /// Returns `candidate` if it is a regular file inside the routes directory.
    fn confined(&self, candidate: &Path) -> Option<PathBuf> {
        if !candidate.is_file() {
            return None;
        }
        let root = self.routes_dir.canonicalize().ok()?;
        let real = candidate.canonicalize().ok()?;
        if real.starts_with(&root) {
            Some(candidate.to_path_buf())
        } else {
            debug!(path = %candidate.display(), "Route target is outside the routes directory");
            None
        }
    }
}

/// Decodes a request path and strips leading slashes.
///
/// Returns `None` for anything that is not a plain relative path.
fn sanitize(path: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let relative = decoded.trim_start_matches('/');

    if relative.contains('\0') || relative.contains('\\') {
        return None;
    }
    let plain = Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return None;
    }
    Some(relative.to_string())
}

/// Guesses a content type from a file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" | "shtml" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "wasm" => "application/wasm",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
