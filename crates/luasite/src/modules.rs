// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Reusable modules and the `require` override.
//!
//! Every `<name>.lua` file in the modules directory becomes a module called
//! `<name>`. The directory is scanned once at startup and each file is
//! compiled once to check it; a broken module stops startup with
//! [`HostError::ModuleCompile`].
//!
//! Inside an interpreter, `require(name)` is replaced entirely: it runs the
//! module's body again on every call and returns what the body returns.
//! Nothing is memoized, so a module that counts its own invocations sees
//! one run per `require`. Unknown names give `nil, "module '<name>' not
//! found"` instead of raising.
//!
//! The module named `_` is the bootstrap module. The host runs it exactly
//! once, before the first request is served, in the first interpreter the
//! pool hands out. Globals it defines exist only in that interpreter; any
//! state later requests need must go through a shared capability such as
//! `api.list`.
//!
//! ```lua
//! -- modules/greet.lua
//! return function(name) return "Hello, " .. name end
//!
//! -- routes/_.lua
//! local greet = require("greet")
//! return function(req) return { response = greet("world") } end
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mlua::{Function, Lua, MultiValue, Result as LuaResult, Table, Value};
use tracing::{debug, info};

use crate::error::{HostError, Result};
use crate::runtime::error_detail;

/// Name of the bootstrap module.
pub const BOOTSTRAP_MODULE: &str = "_";

/// Registry key of the per-interpreter factory table.
const FACTORY_REGISTRY_KEY: &str = "luasite.module_factories";

/// Looks up module factories for `require`.
///
/// The installed `require` calls [`resolve`](Self::resolve) on every import
/// and invokes the returned factory once per call.
pub trait ImportResolver: Send + Sync {
    /// Returns the factory for `name`, or `None` if there is no such module.
    fn resolve(&self, lua: &Lua, name: &str) -> LuaResult<Option<Function>>;
}

/// Replaces the global `require` with one backed by `resolver`.
pub fn install_import_hook(lua: &Lua, resolver: Arc<dyn ImportResolver>) -> LuaResult<()> {
    let require = lua.create_function(move |lua, name: String| {
        match resolver.resolve(lua, &name)? {
            Some(factory) => factory.call::<MultiValue>(()),
            None => {
                debug!(module = %name, "require: module not found");
                Ok(MultiValue::from_vec(vec![
                    Value::Nil,
                    Value::String(lua.create_string(format!("module '{}' not found", name))?),
                ]))
            }
        }
    })?;
    lua.globals().set("require", require)?;
    Ok(())
}

/// A discovered module file.
#[derive(Debug, Clone)]
struct ModuleSource {
    path: PathBuf,
    source: String,
}

impl ModuleSource {
    fn chunk_name(&self) -> String {
        format!("@{}", self.path.display())
    }
}

/// The modules available to `require`.
///
/// Immutable once loaded; share it between interpreters with an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ModuleSet {
    modules: BTreeMap<String, ModuleSource>,
}

impl ModuleSet {
    /// A set without modules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scans `dir` for `*.lua` files and compiles each one.
    ///
    /// A missing directory yields an empty set.
    pub fn load_all(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "No modules directory");
            return Ok(Self::empty());
        }

        let scratch = Lua::new();
        let mut modules = BTreeMap::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("lua") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            let module = ModuleSource {
                source: fs::read_to_string(&path)?,
                path,
            };
            if let Err(source) = scratch
                .load(module.source.as_str())
                .set_name(module.chunk_name())
                .into_function()
            {
                return Err(HostError::ModuleCompile {
                    name,
                    path: module.path,
                    source,
                });
            }

            debug!(module = %name, "Loaded module");
            modules.insert(name, module);
        }

        info!(count = modules.len(), dir = %dir.display(), "Modules loaded");
        Ok(Self { modules })
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True if there are no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// True if a module called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Module names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Compiles every module into `lua` and installs the `require` override.
    pub fn install(&self, lua: &Lua) -> LuaResult<()> {
        let factories = lua.create_table()?;
        for (name, module) in &self.modules {
            let factory = lua
                .load(module.source.as_str())
                .set_name(module.chunk_name())
                .into_function()?;
            factories.set(name.as_str(), factory)?;
        }
        lua.set_named_registry_value(FACTORY_REGISTRY_KEY, factories)?;
        install_import_hook(lua, Arc::new(InstalledFactories))
    }

    /// Runs the bootstrap module in `lua`, if there is one.
    ///
    /// Returns whether a bootstrap module ran. `lua` must have had
    /// [`install`](Self::install) called on it.
    pub fn run_bootstrap(&self, lua: &Lua) -> Result<bool> {
        if !self.contains(BOOTSTRAP_MODULE) {
            return Ok(false);
        }
        let factory = InstalledFactories
            .resolve(lua, BOOTSTRAP_MODULE)?
            .ok_or_else(|| HostError::Bootstrap("bootstrap module is not installed".to_string()))?;
        factory
            .call::<()>(())
            .map_err(|e| HostError::Bootstrap(error_detail(&e)))?;
        info!("Bootstrap module ran");
        Ok(true)
    }
}

/// Resolves names against the factories [`ModuleSet::install`] put in the
/// registry.
struct InstalledFactories;

impl ImportResolver for InstalledFactories {
    fn resolve(&self, lua: &Lua, name: &str) -> LuaResult<Option<Function>> {
        let factories: Table = lua.named_registry_value(FACTORY_REGISTRY_KEY)?;
        factories.get::<Option<Function>>(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn module_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, source) in files {
            fs::write(dir.path().join(name), source).unwrap();
        }
        dir
    }

    fn installed(set: &ModuleSet) -> Lua {
        let lua = Lua::new();
        set.install(&lua).unwrap();
        lua
    }

    #[test]
    fn test_discovers_lua_files_only() {
        let dir = module_dir(&[
            ("a.lua", "return 1"),
            ("b.lua", "return 2"),
            ("notes.txt", "not a module"),
        ]);
        let set = ModuleSet::load_all(dir.path()).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let set = ModuleSet::load_all("/definitely/not/here").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_compile_error_names_module() {
        let dir = module_dir(&[("broken.lua", "return function(")]);
        match ModuleSet::load_all(dir.path()) {
            Err(HostError::ModuleCompile { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("expected a compile error, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_require_returns_module_value() {
        let dir = module_dir(&[("greet.lua", r#"return function(n) return "Hello, " .. n end"#)]);
        let lua = installed(&ModuleSet::load_all(dir.path()).unwrap());
        let greeting: String = lua
            .load(r#"return require("greet")("Ada")"#)
            .eval()
            .unwrap();
        assert_eq!(greeting, "Hello, Ada");
    }

    #[test]
    fn test_each_require_runs_the_factory() {
        let dir = module_dir(&[("counter.lua", "runs = (runs or 0) + 1\nreturn runs")]);
        let lua = installed(&ModuleSet::load_all(dir.path()).unwrap());
        let values: Vec<i64> = lua
            .load(r#"return { require("counter"), require("counter"), require("counter") }"#)
            .eval()
            .unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_module_is_a_value() {
        let lua = installed(&ModuleSet::empty());
        let (value, message): (Value, String) = lua.load(r#"return require("nope")"#).eval().unwrap();
        assert!(value.is_nil());
        assert_eq!(message, "module 'nope' not found");
    }

    #[test]
    fn test_module_errors_propagate_to_importer() {
        let dir = module_dir(&[("bad.lua", r#"error("module exploded")"#)]);
        let lua = installed(&ModuleSet::load_all(dir.path()).unwrap());
        let err = lua.load(r#"require("bad")"#).exec().unwrap_err();
        assert!(err.to_string().contains("module exploded"));
    }

    #[test]
    fn test_bootstrap_runs_when_asked() {
        let dir = module_dir(&[("_.lua", "booted = (booted or 0) + 1")]);
        let set = ModuleSet::load_all(dir.path()).unwrap();
        let lua = installed(&set);
        assert!(set.run_bootstrap(&lua).unwrap());
        assert_eq!(lua.globals().get::<i64>("booted").unwrap(), 1);

        let without = ModuleSet::empty();
        assert!(!without.run_bootstrap(&installed(&without)).unwrap());
    }

    #[test]
    fn test_bootstrap_failure() {
        let dir = module_dir(&[("_.lua", r#"error("no config", 0)"#)]);
        let set = ModuleSet::load_all(dir.path()).unwrap();
        let lua = installed(&set);
        match set.run_bootstrap(&lua) {
            Err(HostError::Bootstrap(detail)) => assert_eq!(detail, "no config"),
            other => panic!("expected a bootstrap error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_custom_resolver() {
        struct Fixed;
        impl ImportResolver for Fixed {
            fn resolve(&self, lua: &Lua, name: &str) -> LuaResult<Option<Function>> {
                if name == "answer" {
                    Ok(Some(lua.create_function(|_, ()| Ok(42))?))
                } else {
                    Ok(None)
                }
            }
        }

        let lua = Lua::new();
        install_import_hook(&lua, Arc::new(Fixed)).unwrap();
        let answer: i64 = lua.load(r#"return require("answer")"#).eval().unwrap();
        assert_eq!(answer, 42);
    }
}
