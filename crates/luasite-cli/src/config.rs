// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Site configuration.
//!
//! Configuration is loaded from `luasite.toml` at the project root. Every
//! field has a default, and a missing file means all defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! workers = 64
//!
//! [paths]
//! routes_dir = "routes"
//! modules_dir = "modules"
//! errors_dir = "routes/errors"
//! data_dir = "data"
//!
//! [pool]
//! initial = 2
//! max = 8
//! checkout_timeout_ms = 30000
//!
//! [errors]
//! verbose = false
//!
//! [lists]
//! reset_on_start = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use luasite::{HostOptions, PoolConfig};
use serde::Deserialize;

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "luasite.toml";

/// Main configuration structure loaded from `luasite.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Site directories.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Interpreter pool sizing.
    #[serde(default)]
    pub pool: PoolSettings,
    /// Error reporting.
    #[serde(default)]
    pub errors: ErrorsConfig,
    /// Shared list storage.
    #[serde(default)]
    pub lists: ListsConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1").
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port (default: 8080).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Requests dispatched at the same time (default: 64).
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

/// Site directories, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Route scripts, markup and static files (default: "routes").
    #[serde(default = "default_routes_dir")]
    pub routes_dir: String,

    /// Modules available to `require` (default: "modules").
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// Error pages (default: "routes/errors").
    #[serde(default = "default_errors_dir")]
    pub errors_dir: String,

    /// Persistent data such as the list database (default: "data").
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_routes_dir() -> String {
    "routes".to_string()
}

fn default_modules_dir() -> String {
    "modules".to_string()
}

fn default_errors_dir() -> String {
    "routes/errors".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            routes_dir: default_routes_dir(),
            modules_dir: default_modules_dir(),
            errors_dir: default_errors_dir(),
            data_dir: default_data_dir(),
        }
    }
}

/// Interpreter pool sizing as written in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Interpreters built at startup (default: 2).
    #[serde(default = "default_initial")]
    pub initial: usize,

    /// Upper bound on interpreters (default: 8).
    #[serde(default = "default_max")]
    pub max: usize,

    /// How long a request waits for a free interpreter (default: 30000).
    #[serde(default = "default_checkout_timeout_ms")]
    pub checkout_timeout_ms: u64,
}

fn default_initial() -> usize {
    2
}

fn default_max() -> usize {
    8
}

fn default_checkout_timeout_ms() -> u64 {
    30_000
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            initial: default_initial(),
            max: default_max(),
            checkout_timeout_ms: default_checkout_timeout_ms(),
        }
    }
}

impl From<&PoolSettings> for PoolConfig {
    fn from(settings: &PoolSettings) -> Self {
        PoolConfig {
            initial: settings.initial,
            max: settings.max,
            checkout_timeout: Duration::from_millis(settings.checkout_timeout_ms),
        }
    }
}

/// Error reporting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorsConfig {
    /// Show error details to clients (default: false).
    #[serde(default)]
    pub verbose: bool,
}

/// Shared list storage.
#[derive(Debug, Clone, Deserialize)]
pub struct ListsConfig {
    /// Wipe every list when the server starts (default: true).
    #[serde(default = "default_reset_on_start")]
    pub reset_on_start: bool,
}

fn default_reset_on_start() -> bool {
    true
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            reset_on_start: default_reset_on_start(),
        }
    }
}

impl Config {
    /// Loads `luasite.toml` from the current directory.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Loads `luasite.toml` from `project_dir`, or defaults if it is absent.
    pub fn load_from(project_dir: &Path) -> anyhow::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Directory holding the list database, resolved against `project_dir`.
    pub fn data_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.paths.data_dir)
    }

    /// Host options with every directory resolved against `project_dir`.
    pub fn host_options(&self, project_dir: &Path) -> HostOptions {
        HostOptions::new(
            project_dir.join(&self.paths.routes_dir),
            project_dir.join(&self.paths.modules_dir),
        )
        .with_errors_dir(project_dir.join(&self.paths.errors_dir))
        .with_pool(PoolConfig::from(&self.pool))
        .with_verbose_errors(self.errors.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.server.workers, 64);
        assert_eq!(config.paths.routes_dir, "routes");
        assert_eq!(config.paths.errors_dir, "routes/errors");
        assert_eq!(config.pool.max, 8);
        assert!(!config.errors.verbose);
        assert!(config.lists.reset_on_start);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[server]\nport = 9000\n\n[pool]\nmax = 3\ncheckout_timeout_ms = 250\n\n[lists]\nreset_on_start = false\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.pool.initial, 2);
        assert!(!config.lists.reset_on_start);

        let pool = PoolConfig::from(&config.pool);
        assert_eq!(pool.max, 3);
        assert_eq!(pool.checkout_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_host_options_resolve_against_project() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.errors.verbose = true;

        let options = config.host_options(dir.path());
        assert_eq!(options.routes_dir, dir.path().join("routes"));
        assert_eq!(options.modules_dir, dir.path().join("modules"));
        assert_eq!(options.errors_dir, dir.path().join("routes/errors"));
        assert!(options.verbose_errors);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[server\nport = ").unwrap();
        assert!(Config::load_from(dir.path()).is_err());
    }
}
