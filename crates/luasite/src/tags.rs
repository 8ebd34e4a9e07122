// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Inline Lua regions in `.shtml` documents.
//!
//! A region starts with `<$lua`, optional whitespace and `>`, and ends at
//! the next `<$>`:
//!
//! ```html
//! <p>Served at <$lua> return api.util.timestamp() <$></p>
//! ```
//!
//! The region body is trimmed and run as a chunk in a fresh environment.
//! Its first return value replaces the region (`nil` becomes nothing). A
//! failing region is replaced by `<div class="_error">...</div>` and the
//! rest of the document is still processed.

use lazy_static::lazy_static;
use mlua::{Lua, MultiValue, Result as LuaResult, Value};
use regex::{Captures, Regex};
use tracing::warn;

use crate::error_pages::{client_message, html_escape};
use crate::extensions::display_value;
use crate::runtime::{error_detail, fresh_environment};

lazy_static! {
    static ref LUA_REGION: Regex = Regex::new(r"(?s)<\$lua\s*>(.*?)<\$>").expect("valid region regex");
}

/// Expands inline Lua regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagProcessor {
    verbose: bool,
}

impl TagProcessor {
    /// Creates a processor; `verbose` controls error detail in output.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Replaces every region of `document` with its output.
    pub fn process(&self, lua: &Lua, document: &str) -> String {
        LUA_REGION
            .replace_all(document, |caps: &Captures| self.render(lua, caps[1].trim()))
            .into_owned()
    }

    fn render(&self, lua: &Lua, code: &str) -> String {
        match evaluate(lua, code) {
            Ok(output) => output,
            Err(e) => {
                let detail = error_detail(&e);
                warn!(error = %detail, "Inline Lua region failed");
                format!(
                    "<div class=\"_error\">{}</div>",
                    html_escape(&client_message(self.verbose, &detail))
                )
            }
        }
    }
}

fn evaluate(lua: &Lua, code: &str) -> LuaResult<String> {
    let values: MultiValue = lua
        .load(code)
        .set_name("=shtml")
        .set_environment(fresh_environment(lua)?)
        .eval()?;
    match values.into_iter().next() {
        None | Some(Value::Nil) => Ok(String::new()),
        Some(value) => display_value(lua, &value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_are_replaced() {
        let lua = Lua::new();
        let out = TagProcessor::new(false).process(
            &lua,
            "<p><$lua> return 1 + 1 <$></p><p><$lua   >return 'x'<$></p>",
        );
        assert_eq!(out, "<p>2</p><p>x</p>");
    }

    #[test]
    fn test_multiline_region() {
        let lua = Lua::new();
        let doc = "<ul>\n<$lua>\nlocal s = ''\nfor i = 1, 3 do s = s .. '<li>' .. i .. '</li>' end\nreturn s\n<$>\n</ul>";
        let out = TagProcessor::new(false).process(&lua, doc);
        assert_eq!(out, "<ul>\n<li>1</li><li>2</li><li>3</li>\n</ul>");
    }

    #[test]
    fn test_nil_and_no_return_render_empty() {
        let lua = Lua::new();
        let out = TagProcessor::new(false).process(&lua, "a<$lua>return nil<$>b<$lua>local x = 1<$>c");
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_failures_render_inline() {
        let lua = Lua::new();
        let doc = "<$lua>error('bad', 0)<$>|<$lua>return 'ok'<$>";

        let quiet = TagProcessor::new(false).process(&lua, doc);
        assert_eq!(quiet, "<div class=\"_error\">Error</div>|ok");

        let verbose = TagProcessor::new(true).process(&lua, doc);
        assert_eq!(verbose, "<div class=\"_error\">Error: bad</div>|ok");
    }

    #[test]
    fn test_failure_detail_is_escaped() {
        let lua = Lua::new();
        let out = TagProcessor::new(true).process(&lua, "<$lua>error('<img src=x> & co', 0)<$>");
        assert_eq!(out, "<div class=\"_error\">Error: &lt;img src=x&gt; &amp; co</div>");
    }

    #[test]
    fn test_document_without_regions_is_unchanged() {
        let lua = Lua::new();
        let doc = "<p>plain <$lua without close</p>";
        assert_eq!(TagProcessor::new(false).process(&lua, doc), doc);
    }

    #[test]
    fn test_regions_do_not_leak_globals() {
        let lua = Lua::new();
        let out = TagProcessor::new(false)
            .process(&lua, "<$lua>leak = 1<$><$lua>return tostring(leak)<$>");
        assert_eq!(out, "nil");
    }
}
