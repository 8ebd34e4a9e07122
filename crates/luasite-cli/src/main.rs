// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use luasite_cli::commands;
use luasite_cli::commands::serve::ServeOptions;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "luasite")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Serve filesystem-routed Lua scripts over HTTP", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Project name (defaults to current directory name)
        name: Option<String>,
    },
    /// Serve the site in the current directory
    Serve {
        /// Port to listen on (overrides luasite.toml)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to (overrides luasite.toml)
        #[arg(long)]
        host: Option<String>,
        /// Send error details to clients
        #[arg(long)]
        verbose_errors: bool,
        /// Project directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    match cli.command {
        Commands::Init { name } => commands::init::run(name).await,
        Commands::Serve {
            port,
            host,
            verbose_errors,
            dir,
        } => {
            commands::serve::run(ServeOptions {
                project_dir: dir,
                host,
                port,
                verbose_errors,
            })
            .await
        }
    }
}
