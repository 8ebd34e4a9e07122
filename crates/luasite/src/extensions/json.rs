// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! JSON module registration for Lua.
//!
//! Provides `json.encode`, `json.decode`, `json.encode_pretty`, and `json.null`,
//! both as the global `json` and as `api.json`.

use mlua::{IntoLuaMulti, Lua, LuaSerdeExt, Result as LuaResult, Table, Value};

use super::{api_table, recover};

/// Register the json module on the given Lua instance.
///
/// # Example
///
/// ```rust,ignore
/// use mlua::Lua;
/// use luasite::extensions::register_json_module;
///
/// let lua = Lua::new();
/// register_json_module(&lua)?;
/// ```
pub fn register_json_module(lua: &Lua) -> LuaResult<()> {
    let json_module = create_json_table(lua)?;
    lua.globals().set("json", json_module.clone())?;
    api_table(lua)?.set("json", json_module)?;
    Ok(())
}

fn create_json_table(lua: &Lua) -> LuaResult<Table> {
    let json_module = lua.create_table()?;

    // Lua value -> JSON string
    json_module.set(
        "encode",
        lua.create_function(|lua, value: Value| {
            recover(lua, serde_json::to_string(&value))
        })?,
    )?;

    json_module.set(
        "encode_pretty",
        lua.create_function(|lua, value: Value| {
            recover(lua, serde_json::to_string_pretty(&value))
        })?,
    )?;

    // JSON string -> Lua value
    json_module.set(
        "decode",
        lua.create_function(|lua, json_str: String| {
            let decoded = serde_json::from_str::<serde_json::Value>(&json_str)
                .map_err(|err| format!("JSON decode error: {}", err));
            match decoded {
                Ok(json_value) => lua.to_value(&json_value)?.into_lua_multi(lua),
                Err(message) => recover(lua, Err::<Value, _>(message)),
            }
        })?,
    )?;

    json_module.set("null", lua.null())?;

    Ok(json_module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let lua = Lua::new();
        register_json_module(&lua).unwrap();

        let encoded: String = lua
            .load(r#"return json.encode({ name = "Ada" })"#)
            .eval()
            .unwrap();
        assert_eq!(encoded, r#"{"name":"Ada"}"#);

        let name: String = lua
            .load(r#"return api.json.decode('{"name":"Ada","tags":[1,2]}').name"#)
            .eval()
            .unwrap();
        assert_eq!(name, "Ada");
    }

    #[test]
    fn test_decode_failure_is_a_value() {
        let lua = Lua::new();
        register_json_module(&lua).unwrap();

        let (value, message): (Value, String) = lua
            .load(r#"return json.decode("{not json")"#)
            .eval()
            .unwrap();
        assert!(value.is_nil());
        assert!(message.starts_with("JSON decode error"));
    }
}
