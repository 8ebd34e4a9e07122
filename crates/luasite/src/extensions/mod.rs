// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Host capabilities exposed to Lua.
//!
//! Everything lives under the global `api` table:
//!
//! | Namespace  | Concern                                  |
//! |------------|------------------------------------------|
//! | `api.os`   | filesystem and path helpers              |
//! | `api.html` | markup builder and response helpers      |
//! | `api.util` | hashing, encoding, ids, host telemetry   |
//! | `api.list` | shared lists (see [`crate::lists`])      |
//! | `api.json` | JSON encode/decode (also global `json`)  |
//!
//! `api.http` is registered by the CLI, which owns the network client.
//!
//! Capabilities never raise for OS, network or storage failures. They
//! return `nil, message` so guest code can branch on the result.

/// Markup builder and response helpers.
pub mod html;
/// Filesystem helpers.
pub mod fs;
/// JSON module.
pub mod json;
/// Generic utilities.
pub mod util;

pub use fs::register_os_module;
pub use html::{register_html_module, HtmlBuilder};
pub use json::register_json_module;
pub use util::register_util_module;

use std::fmt::Display;
use std::sync::Arc;

use mlua::{IntoLuaMulti, Lua, MultiValue, Result as LuaResult, Table, Value};

use crate::error_pages::ErrorPageResolver;
use crate::lists::{register_list_module, ListStore};

/// Shared state captured by the capability closures.
#[derive(Clone)]
pub struct Capabilities {
    /// Backing store for `api.list`.
    pub lists: Arc<dyn ListStore>,
    /// Resolver used by `api.html.serveError`.
    pub errors: Arc<ErrorPageResolver>,
}

/// Registers every library-provided capability on `lua`.
pub fn register_capabilities(lua: &Lua, capabilities: &Capabilities) -> LuaResult<()> {
    register_json_module(lua)?;
    register_os_module(lua)?;
    register_util_module(lua)?;
    register_html_module(lua, capabilities.errors.clone())?;
    register_list_module(lua, capabilities.lists.clone())?;
    Ok(())
}

/// Returns the global `api` table, creating it on first use.
pub fn api_table(lua: &Lua) -> LuaResult<Table> {
    let globals = lua.globals();
    match globals.get::<Value>("api")? {
        Value::Table(table) => Ok(table),
        _ => {
            let table = lua.create_table()?;
            globals.set("api", table.clone())?;
            Ok(table)
        }
    }
}

/// Turns a fallible host result into Lua return values.
///
/// `Ok(v)` returns `v`; `Err(e)` returns `nil, tostring(e)`.
pub fn recover<T, E>(lua: &Lua, result: Result<T, E>) -> LuaResult<MultiValue>
where
    T: IntoLuaMulti,
    E: Display,
{
    match result {
        Ok(value) => value.into_lua_multi(lua),
        Err(e) => Ok(MultiValue::from_vec(vec![
            Value::Nil,
            Value::String(lua.create_string(e.to_string())?),
        ])),
    }
}

/// Stringifies a Lua value the way Lua's `tostring` does.
pub fn display_value(lua: &Lua, value: &Value) -> LuaResult<String> {
    match value {
        Value::String(s) => Ok(s.to_string_lossy()),
        other => {
            let tostring: mlua::Function = lua.globals().get("tostring")?;
            tostring.call::<String>(other.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_table_is_reused() {
        let lua = Lua::new();
        let first = api_table(&lua).unwrap();
        first.set("marker", 1).unwrap();
        let second = api_table(&lua).unwrap();
        assert_eq!(second.get::<i64>("marker").unwrap(), 1);
    }

    #[test]
    fn test_recover_error_shape() {
        let lua = Lua::new();
        let failed: Result<i64, String> = Err("boom".to_string());
        let values = recover(&lua, failed).unwrap();
        let values: Vec<Value> = values.into_iter().collect();
        assert!(values[0].is_nil());
        assert_eq!(values[1].as_str().unwrap().to_string(), "boom");
    }

    #[test]
    fn test_display_value() {
        let lua = Lua::new();
        assert_eq!(display_value(&lua, &Value::Integer(3)).unwrap(), "3");
        assert_eq!(display_value(&lua, &Value::Number(1.5)).unwrap(), "1.5");
        assert_eq!(display_value(&lua, &Value::Boolean(true)).unwrap(), "true");
        assert_eq!(display_value(&lua, &Value::Nil).unwrap(), "nil");
    }
}
