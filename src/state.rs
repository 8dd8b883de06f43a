//! Circuit breaker states and status snapshots.

use std::fmt::{self, Display, Formatter};

use tokio::time::Instant;

/// Represents the possible states of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Circuit is closed and calls are allowed.
    Closed,

    /// Circuit is open and calls are rejected.
    Open,

    /// Circuit is allowing a trial call to test recovery.
    HalfOpen,
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            State::Closed => write!(f, "closed"),
            State::Open => write!(f, "open"),
            State::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// A read-only snapshot of a circuit breaker's bookkeeping.
///
/// Produced by [`CircuitBreaker::status`](crate::CircuitBreaker::status) for
/// monitoring and user-facing messaging. `next_retry_time` is populated only
/// while the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitStatus {
    /// The state at the time of the snapshot.
    pub state: State,

    /// Consecutive failures recorded since the last closed-entry.
    pub failure_count: u32,

    /// Earliest time a recovery attempt may be made, while open.
    pub next_retry_time: Option<Instant>,
}
