//! Deferred processor configuration

use satchel_core::Result;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Produces a configuration on first use
pub type Initializer<C> = Box<dyn Fn() -> Result<C> + Send + Sync>;

enum ConfigState<C> {
    Unresolved(Initializer<C>),
    Resolved(Arc<C>),
}

/// Configuration that is either given up front or resolved once from an
/// initializer, then cached.
///
/// Lives on the descriptor, so every instance of a field shares the same
/// resolution. A failing initializer leaves the state unresolved and is
/// tried again on the next access.
pub struct LazyConfig<C> {
    state: Mutex<ConfigState<C>>,
}

impl<C> LazyConfig<C> {
    pub fn resolved(config: C) -> Self {
        Self {
            state: Mutex::new(ConfigState::Resolved(Arc::new(config))),
        }
    }

    pub fn deferred<F>(init: F) -> Self
    where
        F: Fn() -> Result<C> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(ConfigState::Unresolved(Box::new(init))),
        }
    }

    /// Get the configuration, running the initializer if needed
    pub fn get(&self) -> Result<Arc<C>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let config = match &*state {
            ConfigState::Resolved(config) => return Ok(Arc::clone(config)),
            ConfigState::Unresolved(init) => Arc::new(init()?),
        };
        *state = ConfigState::Resolved(Arc::clone(&config));
        Ok(config)
    }

    pub fn is_resolved(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        matches!(&*state, ConfigState::Resolved(_))
    }
}

impl<C: fmt::Debug> fmt::Debug for LazyConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &*state {
            ConfigState::Unresolved(_) => write!(f, "LazyConfig(<unresolved>)"),
            ConfigState::Resolved(config) => f.debug_tuple("LazyConfig").field(config).finish(),
        }
    }
}
