// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Lua registration for shared lists.

use super::ListStore;
use crate::extensions::{api_table, display_value, recover};
use mlua::{IntoLuaMulti, Lua, Result as LuaResult, Value};
use std::sync::Arc;

/// Registers `api.list` backed by the given store.
///
/// Items may be passed as any Lua value; they are stored as their string
/// form, so `appendToList("n", 3)` and `appendToList("n", "3")` are the same.
///
/// # Example
///
/// ```rust,ignore
/// use luasite::lists::{register_list_module, MemoryListStore};
///
/// let lua = Lua::new();
/// register_list_module(&lua, Arc::new(MemoryListStore::new()))?;
/// ```
pub fn register_list_module(lua: &Lua, store: Arc<dyn ListStore>) -> LuaResult<()> {
    let list = lua.create_table()?;

    let store_append = store.clone();
    list.set(
        "appendToList",
        lua.create_function(move |lua, (id, item): (String, Value)| {
            let item = display_value(lua, &item)?;
            recover(
                lua,
                store_append
                    .append(&id, &item)
                    .map(|_| format!("Item added to list {}", id)),
            )
        })?,
    )?;

    let store_remove = store.clone();
    list.set(
        "removeFromList",
        lua.create_function(move |lua, (id, item): (String, Value)| {
            let item = display_value(lua, &item)?;
            recover(
                lua,
                store_remove.remove(&id, &item).map(|removed| {
                    if removed {
                        format!("Item removed from list {}", id)
                    } else {
                        format!("Item not found in list {}", id)
                    }
                }),
            )
        })?,
    )?;

    let store_get = store.clone();
    list.set(
        "getListData",
        lua.create_function(move |lua, id: String| match store_get.get(&id) {
            Ok(items) => lua.create_sequence_from(items)?.into_lua_multi(lua),
            Err(e) => recover(lua, Err::<(), _>(e)),
        })?,
    )?;

    // 1-based like Lua sequences; out of range is nil
    let store_item = store.clone();
    list.set(
        "getItem",
        lua.create_function(move |lua, (id, index): (String, i64)| {
            let item = store_item.get(&id).map(|items| {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| items.get(i).cloned())
            });
            recover(lua, item)
        })?,
    )?;

    let store_delete = store.clone();
    list.set(
        "deleteList",
        lua.create_function(move |lua, id: String| {
            recover(
                lua,
                store_delete
                    .delete(&id)
                    .map(|_| format!("List {} deleted", id)),
            )
        })?,
    )?;

    let store_exists = store;
    list.set(
        "listExists",
        lua.create_function(move |lua, id: String| recover(lua, store_exists.exists(&id)))?,
    )?;

    api_table(lua)?.set("list", list)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::MemoryListStore;

    fn create_test_lua() -> Lua {
        let lua = Lua::new();
        register_list_module(&lua, Arc::new(MemoryListStore::new())).unwrap();
        lua
    }

    #[test]
    fn test_round_trip_messages() {
        let lua = create_test_lua();
        let messages: Vec<String> = lua
            .load(
                r#"
                return {
                    api.list.appendToList("todo", "x"),
                    api.list.removeFromList("todo", "x"),
                    api.list.removeFromList("todo", "x"),
                    api.list.deleteList("todo"),
                }
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(
            messages,
            vec![
                "Item added to list todo",
                "Item removed from list todo",
                "Item not found in list todo",
                "List todo deleted",
            ]
        );
    }

    #[test]
    fn test_get_list_data_and_item() {
        let lua = create_test_lua();
        lua.load(
            r#"
            api.list.appendToList("l", "x")
            api.list.appendToList("l", 2)
            data = api.list.getListData("l")
            first = api.list.getItem("l", 1)
            missing = api.list.getItem("l", 5)
            zero = api.list.getItem("l", 0)
            "#,
        )
        .exec()
        .unwrap();

        let data: Vec<String> = lua.globals().get("data").unwrap();
        assert_eq!(data, vec!["x", "2"]);
        assert_eq!(lua.globals().get::<String>("first").unwrap(), "x");
        assert!(lua.globals().get::<Value>("missing").unwrap().is_nil());
        assert!(lua.globals().get::<Value>("zero").unwrap().is_nil());
    }

    #[test]
    fn test_numeric_removal_and_exists() {
        let lua = create_test_lua();
        let (exists_before, message, remaining): (bool, String, Vec<String>) = lua
            .load(
                r#"
                local before = api.list.listExists("n")
                api.list.appendToList("n", "3")
                api.list.appendToList("n", "3")
                local msg = api.list.removeFromList("n", 3.0)
                return before, msg, api.list.getListData("n")
                "#,
            )
            .eval()
            .unwrap();
        assert!(!exists_before);
        assert_eq!(message, "Item removed from list n");
        assert_eq!(remaining, vec!["3"]);
    }
}
