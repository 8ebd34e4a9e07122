// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Pool of independent Lua interpreters.
//!
//! Each [`Interpreter`] owns its own Lua state with the `api` table and the
//! module `require` installed. A request checks one out exclusively, so no
//! two requests ever run in the same state at the same time.
//!
//! The pool starts with `initial` interpreters and grows on demand up to
//! `max`. When all of them are busy, checkout waits until one is returned
//! or the timeout elapses, which gives [`PoolError::Exhausted`].

use std::ops::Deref;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use mlua::{Lua, Result as LuaResult};
use thiserror::Error;
use tracing::{debug, info};

use crate::extensions::{register_capabilities, Capabilities};
use crate::modules::ModuleSet;

/// Extra setup run on every new interpreter, after the built-in
/// capabilities and before the module `require` is installed.
pub type SetupHook = Arc<dyn Fn(&Lua) -> LuaResult<()> + Send + Sync>;

/// Error type for pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every interpreter stayed busy for the whole checkout timeout.
    #[error("No interpreter became available within {0:?}")]
    Exhausted(Duration),
    /// A new interpreter could not be set up.
    #[error("Failed to build interpreter: {0}")]
    Build(String),
}

/// Pool sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Interpreters built up front.
    pub initial: usize,
    /// Upper bound on live interpreters.
    pub max: usize,
    /// How long a checkout waits for a busy pool.
    pub checkout_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial: 2,
            max: 8,
            checkout_timeout: Duration::from_secs(30),
        }
    }
}

/// One Lua state plus the id it is logged under.
pub struct Interpreter {
    id: usize,
    lua: Lua,
}

impl Interpreter {
    /// Numeric id, unique within its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The Lua state.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

/// Builds fully set up interpreters.
#[derive(Clone)]
pub struct InterpreterBuilder {
    modules: Arc<ModuleSet>,
    capabilities: Capabilities,
    hooks: Vec<SetupHook>,
}

impl InterpreterBuilder {
    /// Creates a builder installing `modules` and `capabilities`.
    pub fn new(modules: Arc<ModuleSet>, capabilities: Capabilities) -> Self {
        Self {
            modules,
            capabilities,
            hooks: Vec::new(),
        }
    }

    /// Adds a setup hook.
    pub fn with_hook(mut self, hook: SetupHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Builds one interpreter.
    pub fn build(&self, id: usize) -> LuaResult<Interpreter> {
        let lua = Lua::new();
        register_capabilities(&lua, &self.capabilities)?;
        for hook in &self.hooks {
            hook(&lua)?;
        }
        self.modules.install(&lua)?;
        debug!(interpreter = id, "Built interpreter");
        Ok(Interpreter { id, lua })
    }
}

struct PoolState {
    idle: Vec<Interpreter>,
    total: usize,
    next_id: usize,
}

/// Bounded, growable pool of interpreters.
pub struct InterpreterPool {
    builder: InterpreterBuilder,
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl InterpreterPool {
    /// Creates a pool and builds the initial interpreters.
    ///
    /// `max` is raised to at least 1 and `initial` capped at `max`.
    pub fn new(builder: InterpreterBuilder, config: PoolConfig) -> Result<Self, PoolError> {
        let max = config.max.max(1);
        let config = PoolConfig {
            initial: config.initial.min(max),
            max,
            ..config
        };

        let mut idle = (0..config.initial)
            .map(|id| builder.build(id).map_err(|e| PoolError::Build(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        // checkout pops from the back; hand out the lowest id first
        idle.reverse();

        info!(
            initial = config.initial,
            max = config.max,
            "Interpreter pool ready"
        );

        Ok(Self {
            builder,
            state: Mutex::new(PoolState {
                total: idle.len(),
                next_id: idle.len(),
                idle,
            }),
            available: Condvar::new(),
            config,
        })
    }

    /// The effective configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of live interpreters.
    pub fn size(&self) -> usize {
        self.lock().total
    }

    /// Number of interpreters not checked out.
    pub fn idle(&self) -> usize {
        self.lock().idle.len()
    }

    /// Checks out an interpreter for exclusive use.
    ///
    /// The interpreter goes back to the pool when the guard is dropped.
    pub fn checkout(&self) -> Result<PooledInterpreter<'_>, PoolError> {
        let deadline = Instant::now() + self.config.checkout_timeout;
        let mut state = self.lock();

        loop {
            if let Some(interpreter) = state.idle.pop() {
                return Ok(self.guard(interpreter));
            }

            if state.total < self.config.max {
                let id = state.next_id;
                state.next_id += 1;
                state.total += 1;
                drop(state);
                return match self.builder.build(id) {
                    Ok(interpreter) => {
                        info!(interpreter = id, "Pool grew");
                        Ok(self.guard(interpreter))
                    }
                    Err(e) => {
                        self.lock().total -= 1;
                        self.available.notify_one();
                        Err(PoolError::Build(e.to_string()))
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::Exhausted(self.config.checkout_timeout));
            }
            state = self
                .available
                .wait_timeout(state, deadline - now)
                .map(|(state, _)| state)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Runs `f` with an exclusively checked out interpreter.
    pub fn with_interpreter<T>(&self, f: impl FnOnce(&Interpreter) -> T) -> Result<T, PoolError> {
        let interpreter = self.checkout()?;
        Ok(f(&interpreter))
    }

    fn guard(&self, interpreter: Interpreter) -> PooledInterpreter<'_> {
        PooledInterpreter {
            pool: self,
            interpreter: Some(interpreter),
        }
    }

    fn release(&self, interpreter: Interpreter) {
        self.lock().idle.push(interpreter);
        self.available.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A checked out interpreter. Returned to its pool on drop.
pub struct PooledInterpreter<'a> {
    pool: &'a InterpreterPool,
    interpreter: Option<Interpreter>,
}

impl Deref for PooledInterpreter<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        // Only taken in drop
        match &self.interpreter {
            Some(interpreter) => interpreter,
            None => unreachable!("interpreter taken before drop"),
        }
    }
}

impl Drop for PooledInterpreter<'_> {
    fn drop(&mut self) {
        if let Some(interpreter) = self.interpreter.take() {
            self.pool.release(interpreter);
        }
    }
}
