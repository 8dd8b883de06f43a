//! Core circuit breaker implementation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::hook::HookRegistry;
use crate::provider::HealthProbe;
use crate::state::{CircuitStatus, State};

/// Mutable bookkeeping of the breaker. Every field lives behind the one
/// `Mutex` in [`Shared`]; the lock is held for bookkeeping only, never across
/// an outbound call.
struct Inner {
    state: State,
    failure_count: u32,
    next_retry_time: Option<Instant>,
    next_health_check_time: Option<Instant>,
    probe_in_flight: bool,
}

/// State shared between breaker handles and the detached probe task.
struct Shared {
    inner: Mutex<Inner>,
    failure_threshold: u32,
    reset_timeout: Duration,
    health_check_interval: Duration,
    probe: Option<Arc<dyn HealthProbe>>,
    hooks: Arc<HookRegistry>,
    probe_task: Mutex<Option<AbortHandle>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(task) = self.probe_task.lock().take() {
            task.abort();
        }
    }
}

/// A circuit breaker gating calls to an unreliable dependency.
///
/// One instance is created per [`ResilientInvoker`](crate::ResilientInvoker)
/// and shared by every caller issuing requests through it. Cloning is cheap;
/// clones share the same state.
///
/// While open, recovery happens one of two ways: with a health probe
/// configured, a detached probe task decides when the circuit may half-open;
/// without one, the circuit half-opens once `reset_timeout` has elapsed.
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker.
    ///
    /// Most callers want [`CircuitBreaker::builder`] instead.
    pub fn new(
        failure_threshold: u32,
        reset_timeout: Duration,
        health_check_interval: Duration,
        probe: Option<Arc<dyn HealthProbe>>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        let shared = Shared {
            inner: Mutex::new(Inner {
                state: State::Closed,
                failure_count: 0,
                next_retry_time: None,
                next_health_check_time: None,
                probe_in_flight: false,
            }),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            health_check_interval,
            probe,
            hooks,
            probe_task: Mutex::new(None),
        };

        Self {
            shared: Arc::new(shared),
        }
    }

    /// Creates a new builder for customizing a circuit breaker.
    pub fn builder() -> crate::config::BreakerBuilder {
        crate::config::BreakerBuilder::new()
    }

    /// Whether a call may be attempted right now.
    pub fn can_execute(&self) -> bool {
        self.current_state() != State::Open
    }

    /// Gets the current state, applying any pending lazy transition first.
    ///
    /// While open with a probe configured, polling this may launch a detached
    /// probe (requires a Tokio runtime); the state returned is unchanged. With
    /// no probe, the open circuit half-opens here once `reset_timeout` has
    /// elapsed.
    pub fn current_state(&self) -> State {
        let mut half_opened = false;
        let mut launch_probe = None;

        let state = {
            let mut inner = self.shared.inner.lock();
            if inner.state == State::Open {
                let now = Instant::now();
                if let Some(probe) = &self.shared.probe {
                    let due = inner.next_health_check_time.map_or(true, |t| now >= t);
                    if due && !inner.probe_in_flight {
                        inner.probe_in_flight = true;
                        launch_probe = Some(Arc::clone(probe));
                    }
                } else if inner.next_retry_time.is_some_and(|t| now >= t) {
                    inner.state = State::HalfOpen;
                    half_opened = true;
                }
            }
            inner.state
        };

        if let Some(probe) = launch_probe {
            self.spawn_probe(probe);
        }
        if half_opened {
            info!("circuit half-open, allowing a trial call");
            self.shared.hooks.execute_half_open();
        }

        state
    }

    /// Records a successful call.
    ///
    /// Half-open: recovery confirmed, the circuit closes and the failure
    /// counter resets. Closed: a prior isolated failure is forgiven. Open:
    /// no-op.
    pub fn record_success(&self) {
        let closed = {
            let mut inner = self.shared.inner.lock();
            match inner.state {
                State::HalfOpen => {
                    inner.state = State::Closed;
                    inner.failure_count = 0;
                    inner.next_retry_time = None;
                    inner.next_health_check_time = None;
                    true
                }
                State::Closed => {
                    inner.failure_count = 0;
                    false
                }
                State::Open => false,
            }
        };

        if closed {
            info!("circuit closed after successful trial call");
            self.shared.hooks.execute_close();
        }
    }

    /// Records a failed call.
    ///
    /// A half-open failure is a failed recovery attempt: the circuit reopens
    /// immediately regardless of the counter. While closed, the circuit opens
    /// once the counter reaches the failure threshold. `backoff_override`
    /// replaces the default reset timeout for this opening, letting callers
    /// push recovery further out for rate-limit-style failures.
    pub fn record_failure(&self, backoff_override: Option<Duration>) {
        let opened = {
            let mut inner = self.shared.inner.lock();
            inner.failure_count = inner.failure_count.saturating_add(1);

            let trip = match inner.state {
                State::HalfOpen => true,
                State::Closed => inner.failure_count >= self.shared.failure_threshold,
                State::Open => false,
            };

            if trip {
                let now = Instant::now();
                let retry_at = now + backoff_override.unwrap_or(self.shared.reset_timeout);
                inner.state = State::Open;
                inner.next_retry_time = Some(retry_at);
                inner.next_health_check_time = self
                    .shared
                    .probe
                    .as_ref()
                    .map(|_| now + self.shared.health_check_interval);
                Some((inner.failure_count, retry_at))
            } else {
                None
            }
        };

        if let Some((failures, retry_at)) = opened {
            warn!(failures, "circuit opened");
            self.shared.hooks.execute_open(retry_at);
        }
    }

    /// Forces the circuit closed and clears all bookkeeping.
    ///
    /// Intended for manual operator override.
    pub fn reset(&self) {
        let was = {
            let mut inner = self.shared.inner.lock();
            let was = inner.state;
            inner.state = State::Closed;
            inner.failure_count = 0;
            inner.next_retry_time = None;
            inner.next_health_check_time = None;
            was
        };

        if was != State::Closed {
            info!(from = %was, "circuit manually reset");
            self.shared.hooks.execute_close();
        }
    }

    /// Read-only snapshot of the breaker's bookkeeping.
    pub fn status(&self) -> CircuitStatus {
        let inner = self.shared.inner.lock();
        CircuitStatus {
            state: inner.state,
            failure_count: inner.failure_count,
            next_retry_time: match inner.state {
                State::Open => inner.next_retry_time,
                _ => None,
            },
        }
    }

    /// Earliest time a caller should retry, for user-facing messaging.
    pub(crate) fn estimated_retry_at(&self) -> Instant {
        let inner = self.shared.inner.lock();
        match (inner.state, inner.next_retry_time) {
            (State::Open, Some(t)) => t,
            _ => Instant::now() + self.shared.reset_timeout,
        }
    }

    pub(crate) fn reset_timeout(&self) -> Duration {
        self.shared.reset_timeout
    }

    /// Launches the detached probe task. `probe_in_flight` was already set
    /// under the lock, so a second task can never start while one runs.
    fn spawn_probe(&self, probe: Arc<dyn HealthProbe>) {
        debug!("launching health probe");
        let weak = Arc::downgrade(&self.shared);

        let handle = tokio::spawn(async move {
            let healthy = probe.check().await;

            // The breaker may have been dropped while the probe ran.
            let Some(shared) = weak.upgrade() else { return };

            let half_opened = {
                let mut inner = shared.inner.lock();
                inner.probe_in_flight = false;
                if inner.state == State::Open {
                    if healthy {
                        inner.state = State::HalfOpen;
                        true
                    } else {
                        inner.next_health_check_time =
                            Some(Instant::now() + shared.health_check_interval);
                        false
                    }
                } else {
                    false
                }
            };

            if half_opened {
                info!("health probe succeeded, circuit half-open");
                shared.hooks.execute_half_open();
            } else if !healthy {
                debug!("health probe reported unhealthy");
            }
        });

        *self.shared.probe_task.lock() = Some(handle.abort_handle());
    }
}

// Cloning is cheap, all state is behind the Arc.
impl Clone for CircuitBreaker {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("CircuitBreaker")
            .field("state", &status.state)
            .field("failure_count", &status.failure_count)
            .finish()
    }
}
