//! Hook registry for circuit transition events.
//!
//! Integrators use hooks to surface circuit transitions to their own layers,
//! e.g. posting a "generation paused, back around HH:MM" notice to a chat
//! channel when the circuit opens. Hooks run outside the breaker's lock.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::time::Instant;

type OpenHookFn = Arc<dyn Fn(Instant) + Send + Sync + 'static>;
type HookFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// A registry for circuit breaker transition hooks.
pub struct HookRegistry {
    on_open: RwLock<Option<OpenHookFn>>,
    on_close: RwLock<Option<HookFn>>,
    on_half_open: RwLock<Option<HookFn>>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            on_open: RwLock::new(None),
            on_close: RwLock::new(None),
            on_half_open: RwLock::new(None),
        }
    }

    /// Sets the hook to call when the circuit opens.
    ///
    /// The hook receives the earliest time a recovery attempt may be made.
    pub fn set_on_open<F>(&self, f: F)
    where
        F: Fn(Instant) + Send + Sync + 'static,
    {
        *self.on_open.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when the circuit closes.
    pub fn set_on_close<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_close.write() = Some(Arc::new(f));
    }

    /// Sets the hook to call when the circuit half-opens.
    pub fn set_on_half_open<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_half_open.write() = Some(Arc::new(f));
    }

    pub(crate) fn execute_open(&self, retry_at: Instant) {
        let hook = self.on_open.read().clone();
        if let Some(hook) = hook {
            hook(retry_at);
        }
    }

    pub(crate) fn execute_close(&self) {
        let hook = self.on_close.read().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    pub(crate) fn execute_half_open(&self) {
        let hook = self.on_half_open.read().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}
