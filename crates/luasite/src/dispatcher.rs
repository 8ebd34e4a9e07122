// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Request dispatching.
//!
//! [`Dispatcher::dispatch`] turns a [`ScriptRequest`] into a
//! [`HostResponse`] and never fails:
//!
//! | Situation                    | Response                          |
//! |------------------------------|-----------------------------------|
//! | no route                     | 404 error page                    |
//! | script response / redirect   | as returned (redirects are 302)   |
//! | script raised an error       | script-failure page, 500          |
//! | script returned garbage      | 500 error page                    |
//! | every interpreter busy       | 503 error page                    |
//! | route file unreadable        | 500 error page                    |
//!
//! Dispatching is synchronous; servers run it on a blocking thread.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::error_pages::ErrorPageResolver;
use crate::extensions::Capabilities;
use crate::lists::ListStore;
use crate::modules::ModuleSet;
use crate::pool::{InterpreterBuilder, InterpreterPool, PoolConfig, PoolError, SetupHook};
use crate::request::ScriptRequest;
use crate::response::HostResponse;
use crate::router::{RouteDecision, RouteResolver};
use crate::runtime::{run_script, ScriptError, ScriptResult};
use crate::tags::TagProcessor;

/// Where the host finds its files and how it behaves.
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Route scripts, markup and static files.
    pub routes_dir: PathBuf,
    /// Reusable modules for `require`.
    pub modules_dir: PathBuf,
    /// Error pages (`404.html`, `500.html`, `luaError.html`, ...).
    pub errors_dir: PathBuf,
    /// Interpreter pool sizing.
    pub pool: PoolConfig,
    /// Show error details to clients.
    pub verbose_errors: bool,
}

impl HostOptions {
    /// Options with error pages in `<routes_dir>/errors` and default pool.
    pub fn new(routes_dir: impl Into<PathBuf>, modules_dir: impl Into<PathBuf>) -> Self {
        let routes_dir = routes_dir.into();
        Self {
            errors_dir: routes_dir.join("errors"),
            routes_dir,
            modules_dir: modules_dir.into(),
            pool: PoolConfig::default(),
            verbose_errors: false,
        }
    }

    /// Sets the error page directory.
    pub fn with_errors_dir(mut self, errors_dir: impl Into<PathBuf>) -> Self {
        self.errors_dir = errors_dir.into();
        self
    }

    /// Sets the pool configuration.
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Enables or disables error details in responses.
    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }
}

/// Routes requests to scripts, markup and files.
pub struct Dispatcher {
    router: RouteResolver,
    pool: InterpreterPool,
    errors: Arc<ErrorPageResolver>,
    tags: TagProcessor,
    modules: Arc<ModuleSet>,
}

impl Dispatcher {
    /// Loads modules, builds the interpreter pool and runs the bootstrap
    /// module.
    ///
    /// `hooks` run on every interpreter after the built-in capabilities;
    /// use them to add capabilities of your own.
    pub fn open(
        options: HostOptions,
        lists: Arc<dyn ListStore>,
        hooks: Vec<SetupHook>,
    ) -> Result<Self> {
        let modules = Arc::new(ModuleSet::load_all(&options.modules_dir)?);
        let errors = Arc::new(ErrorPageResolver::new(
            &options.errors_dir,
            options.verbose_errors,
        ));

        let capabilities = Capabilities {
            lists,
            errors: errors.clone(),
        };
        let builder = hooks.into_iter().fold(
            InterpreterBuilder::new(modules.clone(), capabilities),
            InterpreterBuilder::with_hook,
        );
        let pool = InterpreterPool::new(builder, options.pool.clone())?;

        pool.with_interpreter(|interpreter| modules.run_bootstrap(interpreter.lua()))??;

        info!(
            routes = %options.routes_dir.display(),
            modules = modules.len(),
            "Dispatcher ready"
        );

        Ok(Self {
            router: RouteResolver::new(options.routes_dir),
            pool,
            errors,
            tags: TagProcessor::new(options.verbose_errors),
            modules,
        })
    }

    /// The interpreter pool.
    pub fn pool(&self) -> &InterpreterPool {
        &self.pool
    }

    /// The loaded modules.
    pub fn modules(&self) -> &ModuleSet {
        &self.modules
    }

    /// The error page resolver.
    pub fn errors(&self) -> &ErrorPageResolver {
        &self.errors
    }

    /// Handles one request.
    pub fn dispatch(&self, request: ScriptRequest) -> HostResponse {
        let decision = self.router.resolve(&request.path);
        debug!(method = %request.method, path = %request.path, ?decision, "Dispatching");

        match decision {
            RouteDecision::Script(path) => self.run_route_script(&path, &request),
            RouteDecision::Markup(path) => self.render_markup(&path),
            RouteDecision::StaticFile { path, content_type } => match fs::read(&path) {
                Ok(bytes) => HostResponse::content(200, content_type, bytes),
                Err(e) => self.unreadable(&path, e),
            },
            RouteDecision::NotFound => self.errors.resolve(404).into(),
        }
    }

    fn run_route_script(&self, path: &Path, request: &ScriptRequest) -> HostResponse {
        let source = match fs::read(path) {
            Ok(source) => source,
            Err(e) => return self.unreadable(path, e),
        };
        let name = path
            .strip_prefix(self.router.routes_dir())
            .unwrap_or(path)
            .display()
            .to_string();

        let result = self.pool.with_interpreter(|interpreter| {
            debug!(interpreter = interpreter.id(), script = %name, "Running route script");
            run_script(interpreter.lua(), &name, &source, request)
        });

        match result {
            Ok(result) => self.respond(&name, result),
            Err(e) => self.pool_failure(e),
        }
    }

    fn render_markup(&self, path: &Path) -> HostResponse {
        let document = match fs::read_to_string(path) {
            Ok(document) => document,
            Err(e) => return self.unreadable(path, e),
        };

        match self
            .pool
            .with_interpreter(|interpreter| self.tags.process(interpreter.lua(), &document))
        {
            Ok(html) => HostResponse::html(200, html),
            Err(e) => self.pool_failure(e),
        }
    }

    fn respond(&self, script: &str, result: ScriptResult) -> HostResponse {
        match result {
            ScriptResult::Response {
                body,
                status,
                content_type,
                headers,
            } => HostResponse::Content {
                status,
                content_type,
                headers,
                body,
            },
            ScriptResult::Redirect { location } => HostResponse::redirect(location),
            ScriptResult::Error(ScriptError::Raised(detail)) => {
                warn!(script, error = %detail, "Route script failed");
                self.errors.script_failure(&detail).into()
            }
            ScriptResult::Error(ScriptError::Malformed(description)) => {
                warn!(script, problem = %description, "Route script returned an invalid result");
                self.errors.resolve(500).into()
            }
        }
    }

    fn pool_failure(&self, e: PoolError) -> HostResponse {
        match e {
            PoolError::Exhausted(_) => {
                warn!(error = %e, "Interpreter pool exhausted");
                self.errors.resolve(503).into()
            }
            PoolError::Build(_) => {
                error!(error = %e, "Interpreter setup failed");
                self.errors.resolve(500).into()
            }
        }
    }

    fn unreadable(&self, path: &Path, e: std::io::Error) -> HostResponse {
        error!(path = %path.display(), error = %e, "Failed to read route file");
        self.errors.resolve(500).into()
    }
}
