//! Error types for the invocation layer.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tokio::time::Instant;

use crate::provider::ProviderError;

/// Result type for invoker operations.
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Error returned by [`ResilientInvoker`](crate::ResilientInvoker).
///
/// `CircuitOpen` and the fatal variants (`Provider`, `Decode`) carry full,
/// specific detail since they are actionable or diagnostic. `Unavailable`
/// deliberately masks the underlying provider errors: transient and
/// rate-limit failures are not actionable by the caller beyond waiting.
#[derive(Debug)]
pub enum InvokeError {
    /// The circuit is open; no provider was called.
    CircuitOpen {
        /// Earliest time a recovery attempt may be made.
        retry_at: Instant,
    },

    /// Every attempted provider failed with a transient or rate-limit error.
    Unavailable {
        /// Estimated recovery time, for user-facing messaging.
        retry_at: Instant,
    },

    /// A fatal provider failure, propagated with original detail.
    Provider(ProviderError),

    /// The provider's textual output did not parse into the requested shape.
    Decode {
        /// Provider whose output failed to parse.
        provider: String,
        /// The underlying parse failure.
        source: serde_json::Error,
    },
}

impl InvokeError {
    /// The recovery estimate carried by `CircuitOpen` and `Unavailable`.
    pub fn retry_at(&self) -> Option<Instant> {
        match self {
            InvokeError::CircuitOpen { retry_at } | InvokeError::Unavailable { retry_at } => {
                Some(*retry_at)
            }
            _ => None,
        }
    }

    /// True for failures that will recur regardless of upstream health.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InvokeError::Provider(_) | InvokeError::Decode { .. })
    }
}

impl Display for InvokeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::CircuitOpen { retry_at } => write!(
                f,
                "generation is paused while the backend recovers, retry in about {}s",
                retry_at.saturating_duration_since(Instant::now()).as_secs()
            ),
            InvokeError::Unavailable { retry_at } => write!(
                f,
                "service temporarily unavailable, retry in about {}s",
                retry_at.saturating_duration_since(Instant::now()).as_secs()
            ),
            InvokeError::Provider(e) => write!(f, "provider error: {}", e),
            InvokeError::Decode { provider, source } => {
                write!(f, "undecodable response from {}: {}", provider, source)
            }
        }
    }
}

impl Error for InvokeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InvokeError::CircuitOpen { .. } | InvokeError::Unavailable { .. } => None,
            InvokeError::Provider(e) => Some(e),
            InvokeError::Decode { source, .. } => Some(source),
        }
    }
}
