// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Filesystem helpers for Lua (`api.os`).
//!
//! ```lua
//! local names, err = api.os.listDir("data")
//! if not names then return api.html.serveHtml("<p>" .. err .. "</p>") end
//!
//! api.os.makeDirs(api.os.pathJoin("data", "cache"))
//! local head, tail = api.os.pathSplit("/var/log/app.log") -- "/var/log", "app.log"
//! ```
//!
//! Operations that touch the filesystem return `nil, message` on failure.
//! Predicates (`pathExists`, `isDir`, `isFile`, `pathIsLink`) return false.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use mlua::{IntoLuaMulti, Lua, Result as LuaResult, Variadic};

use super::{api_table, recover};

/// Registers `api.os` on the given Lua instance.
pub fn register_os_module(lua: &Lua) -> LuaResult<()> {
    let os = lua.create_table()?;

    os.set(
        "listDir",
        lua.create_function(|lua, path: String| match list_dir(Path::new(&path)) {
            Ok(names) => lua.create_sequence_from(names)?.into_lua_multi(lua),
            Err(e) => recover(lua, Err::<(), _>(e)),
        })?,
    )?;

    os.set(
        "remove",
        lua.create_function(|lua, path: String| recover(lua, fs::remove_file(&path).map(|_| true)))?,
    )?;

    os.set(
        "rename",
        lua.create_function(|lua, (src, dst): (String, String)| {
            recover(lua, fs::rename(&src, &dst).map(|_| true))
        })?,
    )?;

    os.set(
        "pathExists",
        lua.create_function(|_, path: String| Ok(Path::new(&path).exists()))?,
    )?;

    os.set(
        "isDir",
        lua.create_function(|_, path: String| Ok(Path::new(&path).is_dir()))?,
    )?;

    os.set(
        "isFile",
        lua.create_function(|_, path: String| Ok(Path::new(&path).is_file()))?,
    )?;

    os.set(
        "makeDirs",
        lua.create_function(|lua, path: String| {
            recover(lua, fs::create_dir_all(&path).map(|_| true))
        })?,
    )?;

    os.set(
        "removeDir",
        lua.create_function(|lua, path: String| recover(lua, fs::remove_dir(&path).map(|_| true)))?,
    )?;

    os.set(
        "pathJoin",
        lua.create_function(|_, parts: Variadic<String>| {
            let joined: PathBuf = parts.iter().collect();
            Ok(joined.to_string_lossy().into_owned())
        })?,
    )?;

    os.set(
        "pathSplit",
        lua.create_function(|_, path: String| {
            let (head, tail) = split_path(&path);
            Ok((head.to_string(), tail.to_string()))
        })?,
    )?;

    os.set(
        "pathBasename",
        lua.create_function(|_, path: String| Ok(split_path(&path).1.to_string()))?,
    )?;

    os.set(
        "pathDirname",
        lua.create_function(|_, path: String| Ok(split_path(&path).0.to_string()))?,
    )?;

    os.set(
        "pathAbsolute",
        lua.create_function(|lua, path: String| {
            recover(
                lua,
                absolute(Path::new(&path)).map(|p| p.to_string_lossy().into_owned()),
            )
        })?,
    )?;

    os.set(
        "pathGetSize",
        lua.create_function(|lua, path: String| recover(lua, fs::metadata(&path).map(|m| m.len())))?,
    )?;

    os.set(
        "pathIsLink",
        lua.create_function(|_, path: String| {
            Ok(fs::symlink_metadata(&path)
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false))
        })?,
    )?;

    api_table(lua)?.set("os", os)?;
    Ok(())
}

/// Lists directory entry names, sorted.
fn list_dir(path: &Path) -> io::Result<Vec<String>> {
    let mut names = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Splits a path into `(head, tail)` at the last separator.
///
/// `tail` never contains a slash; `head` loses its trailing slashes unless
/// it is the root.
pub(crate) fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(index) => {
            let head = &path[..=index];
            let tail = &path[index + 1..];
            let trimmed = head.trim_end_matches('/');
            if trimmed.is_empty() {
                (head, tail)
            } else {
                (trimmed, tail)
            }
        }
        None => ("", path),
    }
}

/// Makes a path absolute against the working directory and resolves
/// `.` and `..` lexically.
pub(crate) fn absolute(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Value;
    use tempfile::TempDir;

    fn create_test_lua() -> Lua {
        let lua = Lua::new();
        register_os_module(&lua).unwrap();
        lua
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/a/b"), ("/a", "b"));
        assert_eq!(split_path("/a"), ("/", "a"));
        assert_eq!(split_path("a/"), ("a", ""));
        assert_eq!(split_path("a//b"), ("a", "b"));
        assert_eq!(split_path("file.txt"), ("", "file.txt"));
    }

    #[test]
    fn test_absolute_normalizes() {
        let abs = absolute(Path::new("/srv/app/../data/./x")).unwrap();
        assert_eq!(abs, PathBuf::from("/srv/data/x"));
    }

    #[test]
    fn test_directory_roundtrip() {
        let dir = TempDir::new().unwrap();
        let lua = create_test_lua();
        lua.globals()
            .set("root", dir.path().to_string_lossy().to_string())
            .unwrap();

        lua.load(
            r#"
            local nested = api.os.pathJoin(root, "a", "b")
            assert(api.os.makeDirs(nested))
            assert(api.os.isDir(nested))
            local file = io.open(api.os.pathJoin(nested, "f.txt"), "w")
            file:write("hello")
            file:close()
            size = api.os.pathGetSize(api.os.pathJoin(nested, "f.txt"))
            names = api.os.listDir(nested)
            "#,
        )
        .exec()
        .unwrap();

        let size: u64 = lua.globals().get("size").unwrap();
        assert_eq!(size, 5);
        let names: Vec<String> = lua.globals().get("names").unwrap();
        assert_eq!(names, vec!["f.txt".to_string()]);
    }

    #[test]
    fn test_failures_are_values() {
        let lua = create_test_lua();
        let (value, message): (Value, String) = lua
            .load(r#"return api.os.listDir("/definitely/not/here")"#)
            .eval()
            .unwrap();
        assert!(value.is_nil());
        assert!(!message.is_empty());

        let (value, _): (Value, String) = lua
            .load(r#"return api.os.remove("/definitely/not/here.txt")"#)
            .eval()
            .unwrap();
        assert!(value.is_nil());

        let exists: bool = lua
            .load(r#"return api.os.pathExists("/definitely/not/here")"#)
            .eval()
            .unwrap();
        assert!(!exists);
    }
}
