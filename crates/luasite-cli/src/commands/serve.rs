// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Server command.
//!
//! Loads `luasite.toml`, opens the list database, builds the dispatcher
//! (which loads modules and runs the bootstrap module) and serves HTTP.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use luasite::lists::ListStore;
use luasite::Dispatcher;

use crate::config::Config;
use crate::extensions::http_hook;
use crate::lists::SqliteListStore;

/// Command-line overrides for `serve`.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Project root holding `luasite.toml`.
    pub project_dir: PathBuf,
    /// Overrides `server.host`.
    pub host: Option<String>,
    /// Overrides `server.port`.
    pub port: Option<u16>,
    /// Forces `errors.verbose` on.
    pub verbose_errors: bool,
}

/// Loads the configuration and applies command-line overrides.
pub fn resolve_config(options: &ServeOptions) -> anyhow::Result<Config> {
    let mut config = Config::load_from(&options.project_dir)?;
    if let Some(host) = &options.host {
        config.server.host = host.clone();
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }
    if options.verbose_errors {
        config.errors.verbose = true;
    }
    Ok(config)
}

/// Opens the list store and builds a dispatcher for the site.
///
/// Blocking: reads every module and runs the bootstrap module.
pub fn open_site(config: &Config, project_dir: &Path) -> anyhow::Result<Dispatcher> {
    let data_dir = config.data_dir(project_dir);
    let store = SqliteListStore::open(&data_dir)?;
    if config.lists.reset_on_start {
        store.reset()?;
        tracing::info!("Cleared shared lists in {}", data_dir.display());
    }

    let dispatcher = Dispatcher::open(
        config.host_options(project_dir),
        Arc::new(store),
        vec![http_hook()],
    )?;
    Ok(dispatcher)
}

/// Runs the server until interrupted.
pub async fn run(options: ServeOptions) -> anyhow::Result<()> {
    let config = resolve_config(&options)?;
    let addr = config.bind_address();

    let project_dir = options.project_dir.clone();
    let site_config = config.clone();
    let dispatcher =
        tokio::task::spawn_blocking(move || open_site(&site_config, &project_dir)).await??;

    println!(
        "{} {} module(s), {} interpreter(s) ready",
        style("Loaded").green().bold(),
        dispatcher.modules().len(),
        dispatcher.pool().size()
    );
    if config.errors.verbose {
        println!("{}", style("Verbose errors are on; details are sent to clients").yellow());
    }
    println!("Serving at {}", style(format!("http://{}", addr)).cyan());

    crate::server::serve(&addr, Arc::new(dispatcher), config.server.workers).await
}
