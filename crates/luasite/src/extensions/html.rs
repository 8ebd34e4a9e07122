// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Markup helpers for Lua (`api.html`).
//!
//! ```lua
//! local page = api.html.builder()
//!     :doctype()
//!     :open("html"):head():title("Hello"):close()
//!     :body()
//!     :h1("Hello", { class = "title" })
//!     :a("/about"):plain("About"):close()
//!     :finish()
//! return api.html.serveHtml(page)
//! ```
//!
//! Every builder method returns the builder except `finish`, which closes
//! whatever is still open and returns the document. Attributes render in
//! key order. Text and attribute values are inserted as given.

use std::collections::BTreeMap;
use std::sync::Arc;

use mlua::{AnyUserData, Lua, Result as LuaResult, Table, UserData, UserDataMethods, Value};

use super::{api_table, display_value};
use crate::error_pages::ErrorPageResolver;

/// Attribute map; ordered so output is deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Tags that only open (closed later by `close` or `finish`).
const CONTAINER_TAGS: &[&str] = &[
    "head", "body", "div", "span", "p", "ul", "ol", "li", "form", "select", "footer", "header",
    "section", "article", "aside", "main", "nav",
];

/// Tags that wrap a text argument and close immediately.
const TEXT_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "button"];

/// Void tags rendered as `<tag ... />`.
const VOID_TAGS: &[&str] = &["meta", "link", "input"];

/// Fluent HTML document builder.
#[derive(Debug, Default, Clone)]
pub struct HtmlBuilder {
    content: String,
    open_tags: Vec<String>,
}

impl HtmlBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `<!DOCTYPE html>`.
    pub fn doctype(&mut self) -> &mut Self {
        self.content.push_str("<!DOCTYPE html>");
        self
    }

    /// Appends an opening tag that is never closed.
    pub fn standalone(&mut self, tag: &str, attributes: &Attributes) -> &mut Self {
        self.start_tag(tag, attributes, ">");
        self
    }

    /// Appends an opening tag and remembers it for `close`.
    pub fn open(&mut self, tag: &str, attributes: &Attributes) -> &mut Self {
        self.start_tag(tag, attributes, ">");
        self.open_tags.push(tag.to_string());
        self
    }

    /// Appends `<tag ... />`.
    pub fn self_closing(&mut self, tag: &str, attributes: &Attributes) -> &mut Self {
        self.start_tag(tag, attributes, " />");
        self
    }

    /// Appends `<tag ...></tag>`.
    pub fn empty(&mut self, tag: &str, attributes: &Attributes) -> &mut Self {
        self.start_tag(tag, attributes, ">");
        self.end_tag(tag);
        self
    }

    /// Appends raw text.
    pub fn plain(&mut self, text: &str) -> &mut Self {
        self.content.push_str(text);
        self
    }

    /// Opens `tag`, writes `text` and closes it again.
    pub fn text_element(&mut self, tag: &str, text: &str, attributes: &Attributes) -> &mut Self {
        self.open(tag, attributes).plain(text).close(1)
    }

    /// Appends `<tag>body</tag>` without attributes.
    pub fn wrap(&mut self, tag: &str, body: &str) -> &mut Self {
        self.start_tag(tag, &Attributes::new(), ">");
        self.content.push_str(body);
        self.end_tag(tag);
        self
    }

    /// Closes up to `times` open tags, innermost first.
    pub fn close(&mut self, times: usize) -> &mut Self {
        for _ in 0..times {
            match self.open_tags.pop() {
                Some(tag) => self.end_tag(&tag),
                None => break,
            }
        }
        self
    }

    /// Closes every open tag and returns the document.
    pub fn finish(&mut self) -> String {
        let depth = self.open_tags.len();
        self.close(depth);
        self.content.clone()
    }

    fn start_tag(&mut self, tag: &str, attributes: &Attributes, end: &str) {
        self.content.push('<');
        self.content.push_str(tag);
        for (key, value) in attributes {
            self.content.push_str(&format!(" {}=\"{}\"", key, value));
        }
        self.content.push_str(end);
    }

    fn end_tag(&mut self, tag: &str) {
        self.content.push_str("</");
        self.content.push_str(tag);
        self.content.push('>');
    }
}

/// Reads an optional Lua attribute table.
fn attributes(lua: &Lua, table: Option<Table>) -> LuaResult<Attributes> {
    let mut attrs = Attributes::new();
    if let Some(table) = table {
        for pair in table.pairs::<Value, Value>() {
            let (key, value) = pair?;
            attrs.insert(display_value(lua, &key)?, display_value(lua, &value)?);
        }
    }
    Ok(attrs)
}

/// Like [`attributes`], with one extra attribute forced in.
fn attributes_with(
    lua: &Lua,
    table: Option<Table>,
    key: &str,
    value: String,
) -> LuaResult<Attributes> {
    let mut attrs = attributes(lua, table)?;
    attrs.insert(key.to_string(), value);
    Ok(attrs)
}

impl UserData for HtmlBuilder {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_function("doctype", |_, ud: AnyUserData| {
            ud.borrow_mut::<HtmlBuilder>()?.doctype();
            Ok(ud)
        });

        methods.add_function(
            "standalone",
            |lua, (ud, tag, attrs): (AnyUserData, String, Option<Table>)| {
                let attrs = attributes(lua, attrs)?;
                ud.borrow_mut::<HtmlBuilder>()?.standalone(&tag, &attrs);
                Ok(ud)
            },
        );

        methods.add_function(
            "open",
            |lua, (ud, tag, attrs): (AnyUserData, String, Option<Table>)| {
                let attrs = attributes(lua, attrs)?;
                ud.borrow_mut::<HtmlBuilder>()?.open(&tag, &attrs);
                Ok(ud)
            },
        );

        methods.add_function(
            "selfClosing",
            |lua, (ud, tag, attrs): (AnyUserData, String, Option<Table>)| {
                let attrs = attributes(lua, attrs)?;
                ud.borrow_mut::<HtmlBuilder>()?.self_closing(&tag, &attrs);
                Ok(ud)
            },
        );

        methods.add_function(
            "empty",
            |lua, (ud, tag, attrs): (AnyUserData, String, Option<Table>)| {
                let attrs = attributes(lua, attrs)?;
                ud.borrow_mut::<HtmlBuilder>()?.empty(&tag, &attrs);
                Ok(ud)
            },
        );

        methods.add_function("plain", |_, (ud, text): (AnyUserData, String)| {
            ud.borrow_mut::<HtmlBuilder>()?.plain(&text);
            Ok(ud)
        });

        methods.add_function("title", |_, (ud, text): (AnyUserData, String)| {
            ud.borrow_mut::<HtmlBuilder>()?.wrap("title", &text);
            Ok(ud)
        });

        methods.add_function("br", |_, ud: AnyUserData| {
            ud.borrow_mut::<HtmlBuilder>()?.plain("<br>");
            Ok(ud)
        });

        methods.add_function("scriptInline", |_, (ud, code): (AnyUserData, String)| {
            ud.borrow_mut::<HtmlBuilder>()?.wrap("script", &code);
            Ok(ud)
        });

        methods.add_function("style", |_, (ud, css): (AnyUserData, String)| {
            ud.borrow_mut::<HtmlBuilder>()?.wrap("style", &css);
            Ok(ud)
        });

        methods.add_function("close", |_, (ud, times): (AnyUserData, Option<usize>)| {
            ud.borrow_mut::<HtmlBuilder>()?.close(times.unwrap_or(1));
            Ok(ud)
        });

        methods.add_method_mut("finish", |_, this, ()| Ok(this.finish()));

        for &tag in CONTAINER_TAGS {
            methods.add_function(
                tag,
                move |lua, (ud, attrs): (AnyUserData, Option<Table>)| {
                    let attrs = attributes(lua, attrs)?;
                    ud.borrow_mut::<HtmlBuilder>()?.open(tag, &attrs);
                    Ok(ud)
                },
            );
        }

        for &tag in TEXT_TAGS {
            methods.add_function(
                tag,
                move |lua, (ud, text, attrs): (AnyUserData, String, Option<Table>)| {
                    let attrs = attributes(lua, attrs)?;
                    ud.borrow_mut::<HtmlBuilder>()?.text_element(tag, &text, &attrs);
                    Ok(ud)
                },
            );
        }

        for &tag in VOID_TAGS {
            methods.add_function(
                tag,
                move |lua, (ud, attrs): (AnyUserData, Option<Table>)| {
                    let attrs = attributes(lua, attrs)?;
                    ud.borrow_mut::<HtmlBuilder>()?.self_closing(tag, &attrs);
                    Ok(ud)
                },
            );
        }

        methods.add_function(
            "textarea",
            |lua, (ud, attrs): (AnyUserData, Option<Table>)| {
                let attrs = attributes(lua, attrs)?;
                ud.borrow_mut::<HtmlBuilder>()?.open("textarea", &attrs).close(1);
                Ok(ud)
            },
        );

        methods.add_function(
            "a",
            |lua, (ud, href, attrs): (AnyUserData, String, Option<Table>)| {
                let attrs = attributes_with(lua, attrs, "href", href)?;
                ud.borrow_mut::<HtmlBuilder>()?.open("a", &attrs);
                Ok(ud)
            },
        );

        methods.add_function(
            "img",
            |lua, (ud, src, attrs): (AnyUserData, String, Option<Table>)| {
                let attrs = attributes_with(lua, attrs, "src", src)?;
                ud.borrow_mut::<HtmlBuilder>()?.self_closing("img", &attrs);
                Ok(ud)
            },
        );

        methods.add_function(
            "script",
            |lua, (ud, src, attrs): (AnyUserData, String, Option<Table>)| {
                let attrs = attributes_with(lua, attrs, "src", src)?;
                ud.borrow_mut::<HtmlBuilder>()?.standalone("script", &attrs);
                Ok(ud)
            },
        );

        methods.add_function(
            "option",
            |lua, (ud, value, text, attrs): (AnyUserData, String, String, Option<Table>)| {
                let attrs = attributes_with(lua, attrs, "value", value)?;
                ud.borrow_mut::<HtmlBuilder>()?.text_element("option", &text, &attrs);
                Ok(ud)
            },
        );
    }
}

/// Builds the `{response, type, code}` table route scripts return.
pub(crate) fn response_table(
    lua: &Lua,
    body: &str,
    content_type: &str,
    code: u16,
) -> LuaResult<Table> {
    let table = lua.create_table()?;
    table.set("response", body)?;
    table.set("type", content_type)?;
    table.set("code", code)?;
    Ok(table)
}

/// Registers `api.html` on the given Lua instance.
///
/// `serveError` resolves pages through `errors`.
pub fn register_html_module(lua: &Lua, errors: Arc<ErrorPageResolver>) -> LuaResult<()> {
    let html = lua.create_table()?;

    html.set(
        "serveHtml",
        lua.create_function(|lua, body: String| response_table(lua, &body, "text/html", 200))?,
    )?;

    html.set(
        "serveError",
        lua.create_function(move |lua, code: u16| {
            let page = errors.resolve(code);
            response_table(lua, &page.body, &page.content_type, page.status)
        })?,
    )?;

    html.set(
        "builder",
        lua.create_function(|lua, ()| lua.create_userdata(HtmlBuilder::new()))?,
    )?;

    api_table(lua)?.set("html", html)?;
    Ok(())
}
