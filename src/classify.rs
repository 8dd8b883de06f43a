//! Failure classification and backoff policy.

use std::time::Duration;

use crate::provider::ProviderError;

/// Recoverability class of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Will recur regardless of upstream health. Never retried, never
    /// counted against the circuit.
    Fatal,

    /// Outage-shaped failure that resolves on the breaker's default schedule.
    Transient,

    /// Quota-shaped failure that resolves on a longer, backend-enforced
    /// schedule.
    RateLimited,
}

impl FailureKind {
    /// True for the kinds that represent upstream ill-health and should be
    /// recorded against the circuit.
    pub fn is_service_failure(self) -> bool {
        matches!(self, FailureKind::Transient | FailureKind::RateLimited)
    }
}

/// A per-error recovery recommendation. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Recoverability class.
    pub kind: FailureKind,

    /// Recommended cooldown before the next recovery attempt.
    pub backoff: Duration,
}

impl Classification {
    /// Picks the more severe of two recommendations: a service failure beats
    /// a fatal one, and among service failures the longer backoff wins.
    pub fn more_severe(self, other: Classification) -> Classification {
        match (self.kind.is_service_failure(), other.kind.is_service_failure()) {
            (true, false) => self,
            (false, true) => other,
            _ => {
                if other.backoff > self.backoff {
                    other
                } else {
                    self
                }
            }
        }
    }
}

/// Maps provider errors to recovery recommendations.
///
/// Holds only its two backoff durations; classification is purely advisory
/// input to the invoker.
#[derive(Debug, Clone, Copy)]
pub struct FailureClassifier {
    reset_timeout: Duration,
    rate_limit_backoff: Duration,
}

impl FailureClassifier {
    /// Creates a classifier from the breaker's default reset timeout and the
    /// extended backoff applied to rate limits.
    pub fn new(reset_timeout: Duration, rate_limit_backoff: Duration) -> Self {
        Self {
            reset_timeout,
            rate_limit_backoff,
        }
    }

    /// Classifies one provider error.
    pub fn classify(&self, error: &ProviderError) -> Classification {
        match error {
            ProviderError::RateLimited { retry_after, .. } => Classification {
                kind: FailureKind::RateLimited,
                backoff: retry_after.unwrap_or(self.rate_limit_backoff),
            },
            ProviderError::Unavailable { .. } | ProviderError::Timeout { .. } => Classification {
                kind: FailureKind::Transient,
                backoff: self.reset_timeout,
            },
            ProviderError::InvalidRequest { .. } => Classification {
                kind: FailureKind::Fatal,
                backoff: Duration::ZERO,
            },
        }
    }
}
