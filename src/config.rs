//! Configuration builders for breakers and invokers.

use std::sync::Arc;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::classify::FailureClassifier;
use crate::hook::HookRegistry;
use crate::invoker::ResilientInvoker;
use crate::provider::{HealthProbe, Provider};

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(300);

/// Builder for creating circuit breakers with custom configurations.
pub struct BreakerBuilder {
    failure_threshold: u32,
    reset_timeout: Duration,
    health_check_interval: Duration,
    probe: Option<Arc<dyn HealthProbe>>,
    hooks: Arc<HookRegistry>,
}

impl Default for BreakerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            probe: None,
            hooks: Arc::new(HookRegistry::new()),
        }
    }

    /// Sets the number of failures that trips the circuit while closed.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the cooldown before an open circuit may half-open (or, with a
    /// probe configured, the default backoff reported to callers).
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Sets the minimum interval between health probes while open.
    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Sets the out-of-band health probe driving recovery while open.
    ///
    /// With a probe configured, the circuit half-opens only when a probe
    /// reports healthy, never on elapsed time alone. Probes are launched as
    /// detached tasks, so the breaker must be polled from within a Tokio
    /// runtime.
    pub fn health_probe<P: HealthProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Sets the hook registry notified on circuit transitions.
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Builds a new circuit breaker with the configured settings.
    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker::new(
            self.failure_threshold,
            self.reset_timeout,
            self.health_check_interval,
            self.probe,
            self.hooks,
        )
    }
}

/// Builder for creating resilient invokers.
pub struct InvokerBuilder {
    primary: Option<Arc<dyn Provider>>,
    fallback: Option<Arc<dyn Provider>>,
    breaker: Option<CircuitBreaker>,
    rate_limit_backoff: Duration,
}

impl Default for InvokerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvokerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            primary: None,
            fallback: None,
            breaker: None,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        }
    }

    /// Sets the primary provider. Required.
    pub fn primary<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.primary = Some(Arc::new(provider));
        self
    }

    /// Sets the fallback provider, tried only after the primary has failed.
    pub fn fallback<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.fallback = Some(Arc::new(provider));
        self
    }

    /// Sets the circuit breaker gating this invoker's calls.
    ///
    /// Defaults to `CircuitBreaker::builder().build()` when unset.
    pub fn breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Sets the extended backoff applied to rate-limit failures that carry
    /// no backend-supplied `retry_after`.
    pub fn rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    /// Builds a new invoker with the configured settings.
    ///
    /// # Panics
    ///
    /// Panics when no primary provider was configured.
    pub fn build(self) -> ResilientInvoker {
        let primary = match self.primary {
            Some(primary) => primary,
            None => panic!("a primary provider must be configured"),
        };
        let breaker = self
            .breaker
            .unwrap_or_else(|| CircuitBreaker::builder().build());
        let classifier = FailureClassifier::new(breaker.reset_timeout(), self.rate_limit_backoff);

        ResilientInvoker::new(primary, self.fallback, breaker, classifier)
    }
}
