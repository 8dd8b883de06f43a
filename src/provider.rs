//! Provider and health probe capabilities.
//!
//! A [`Provider`] is an interchangeable text-generation backend. Adapters are
//! expected to map their SDK's native failures into [`ProviderError`] at this
//! boundary, so recoverability is encoded in the type rather than recovered
//! later by sniffing error strings.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Generation parameters forwarded opaquely to the backend.
///
/// Integrators typically load these from configuration; the invoker never
/// inspects them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationPreset {
    /// Model the backend should use, if the adapter supports selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// System prompt prepended by the adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// A successful generation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The raw generated text, possibly wrapped in formatting delimiters.
    pub text: String,

    /// The concrete model that served the request.
    pub model: String,
}

/// An interchangeable text-generation backend.
///
/// Implementations are stateless capabilities; the invoker holds a primary
/// and an optional fallback and may call either from many tasks in parallel.
/// Dropping the returned future cancels the in-flight request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used in metadata and logging.
    fn name(&self) -> &str;

    /// Executes one generation request.
    async fn invoke(
        &self,
        prompt: &str,
        preset: &GenerationPreset,
    ) -> Result<Completion, ProviderError>;
}

/// Failure reported by a provider adapter, classified at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Quota or 429-style rejection. `retry_after` carries the backend's own
    /// recommendation when it supplied one.
    RateLimited {
        /// Adapter-supplied detail.
        message: String,
        /// Backend-enforced wait, if the response carried one.
        retry_after: Option<Duration>,
    },

    /// Server-side 5xx-style failure.
    Unavailable {
        /// Adapter-supplied detail.
        message: String,
    },

    /// Network timeout or cancellation of the in-flight request.
    Timeout {
        /// Adapter-supplied detail.
        message: String,
    },

    /// Malformed-request-style rejection. Will recur regardless of upstream
    /// health and must never count against the circuit.
    InvalidRequest {
        /// Adapter-supplied detail.
        message: String,
    },
}

impl ProviderError {
    /// Shorthand for a rate-limit failure without a backend recommendation.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        ProviderError::RateLimited {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Shorthand for a server-side failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            message: message.into(),
        }
    }

    /// Shorthand for a timeout or cancellation.
    pub fn timeout(message: impl Into<String>) -> Self {
        ProviderError::Timeout {
            message: message.into(),
        }
    }

    /// Shorthand for a malformed-request rejection.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        ProviderError::InvalidRequest {
            message: message.into(),
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::RateLimited { message, .. } => {
                write!(f, "rate limited: {}", message)
            }
            ProviderError::Unavailable { message } => {
                write!(f, "backend unavailable: {}", message)
            }
            ProviderError::Timeout { message } => write!(f, "request timed out: {}", message),
            ProviderError::InvalidRequest { message } => {
                write!(f, "invalid request: {}", message)
            }
        }
    }
}

impl Error for ProviderError {}

/// An out-of-band reachability check used while the circuit is open.
///
/// Invoked from a detached task owned by the breaker, at most once
/// concurrently and no more often than the configured interval.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Returns true when the dependency is reachable independently of the
    /// main request path.
    async fn check(&self) -> bool;
}
