//! Resilient multi-provider invocation.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::breaker::CircuitBreaker;
use crate::classify::{Classification, FailureClassifier};
use crate::error::{InvokeError, InvokeResult};
use crate::provider::{Completion, GenerationPreset, Provider, ProviderError};
use crate::state::CircuitStatus;

/// Metadata describing how a successful invocation was served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationMetadata {
    /// Name of the provider that served the request.
    pub provider: String,

    /// Concrete model reported by that provider.
    pub model: String,

    /// Whether the primary failed and the fallback served the request.
    pub used_fallback: bool,
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeOptions {
    /// Abandon an in-flight provider call after this long. A timeout is
    /// classified as transient; no limit is applied when unset.
    pub timeout: Option<Duration>,
}

impl InvokeOptions {
    /// Options with a per-call timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Executes generation requests with circuit gating, failover, and result
/// validation.
///
/// One invoker owns one [`CircuitBreaker`] and is shared by all concurrent
/// callers; provider calls run unsynchronized, only the breaker's bookkeeping
/// is serialized.
pub struct ResilientInvoker {
    primary: Arc<dyn Provider>,
    fallback: Option<Arc<dyn Provider>>,
    breaker: CircuitBreaker,
    classifier: FailureClassifier,
}

impl ResilientInvoker {
    pub(crate) fn new(
        primary: Arc<dyn Provider>,
        fallback: Option<Arc<dyn Provider>>,
        breaker: CircuitBreaker,
        classifier: FailureClassifier,
    ) -> Self {
        Self {
            primary,
            fallback,
            breaker,
            classifier,
        }
    }

    /// Creates a new builder for customizing an invoker.
    pub fn builder() -> crate::config::InvokerBuilder {
        crate::config::InvokerBuilder::new()
    }

    /// Executes one request and decodes the textual result into `T`.
    ///
    /// The raw payload may be wrapped in Markdown-style code fences; these
    /// are stripped before parsing. A parse failure is fatal: it signals a
    /// schema mismatch between the call site and the provider's output, not
    /// an outage, so it is never retried via fallback and never counts
    /// against the circuit.
    pub async fn invoke<T>(
        &self,
        prompt: &str,
        preset: &GenerationPreset,
        options: InvokeOptions,
    ) -> InvokeResult<(T, InvocationMetadata)>
    where
        T: DeserializeOwned,
    {
        let (completion, metadata) = self.execute(prompt, preset, options).await?;
        let payload = strip_delimiters(&completion.text);
        match serde_json::from_str(payload) {
            Ok(value) => Ok((value, metadata)),
            Err(source) => {
                debug!(provider = %metadata.provider, error = %source, "response failed structural decode");
                Err(InvokeError::Decode {
                    provider: metadata.provider,
                    source,
                })
            }
        }
    }

    /// Executes one request and returns the raw completion text.
    ///
    /// Same gating, failover, and classification semantics as [`invoke`],
    /// without the structural decode.
    ///
    /// [`invoke`]: ResilientInvoker::invoke
    pub async fn invoke_text(
        &self,
        prompt: &str,
        preset: &GenerationPreset,
        options: InvokeOptions,
    ) -> InvokeResult<(String, InvocationMetadata)> {
        let (completion, metadata) = self.execute(prompt, preset, options).await?;
        Ok((completion.text, metadata))
    }

    /// Read-only snapshot of the owned circuit breaker.
    pub fn circuit_status(&self) -> CircuitStatus {
        self.breaker.status()
    }

    /// Forces the owned circuit breaker closed. Manual operator override.
    pub fn reset_circuit(&self) {
        self.breaker.reset();
    }

    /// The gating and failover pipeline shared by [`invoke`] and
    /// [`invoke_text`].
    ///
    /// [`invoke`]: ResilientInvoker::invoke
    /// [`invoke_text`]: ResilientInvoker::invoke_text
    async fn execute(
        &self,
        prompt: &str,
        preset: &GenerationPreset,
        options: InvokeOptions,
    ) -> InvokeResult<(Completion, InvocationMetadata)> {
        if !self.breaker.can_execute() {
            return Err(InvokeError::CircuitOpen {
                retry_at: self.breaker.estimated_retry_at(),
            });
        }

        let primary_err = match self.call(&*self.primary, prompt, preset, options).await {
            Ok(completion) => {
                self.breaker.record_success();
                let metadata = InvocationMetadata {
                    provider: self.primary.name().to_string(),
                    model: completion.model.clone(),
                    used_fallback: false,
                };
                return Ok((completion, metadata));
            }
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            let class = self.classifier.classify(&primary_err);
            return Err(self.conclude_failure(primary_err, class));
        };

        warn!(
            provider = self.primary.name(),
            error = %primary_err,
            "primary provider failed, trying fallback"
        );

        match self.call(&**fallback, prompt, preset, options).await {
            Ok(completion) => {
                self.breaker.record_success();
                let metadata = InvocationMetadata {
                    provider: fallback.name().to_string(),
                    model: completion.model.clone(),
                    used_fallback: true,
                };
                Ok((completion, metadata))
            }
            Err(fallback_err) => {
                warn!(
                    provider = fallback.name(),
                    error = %fallback_err,
                    "fallback provider failed"
                );
                let worst = self
                    .classifier
                    .classify(&primary_err)
                    .more_severe(self.classifier.classify(&fallback_err));
                // The primary's error is the most specific one to surface
                // when neither failure was a service failure.
                Err(self.conclude_failure(primary_err, worst))
            }
        }
    }

    /// Invokes one provider under the caller's timeout, mapping an elapsed
    /// deadline into the transient timeout bucket.
    async fn call(
        &self,
        provider: &dyn Provider,
        prompt: &str,
        preset: &GenerationPreset,
        options: InvokeOptions,
    ) -> Result<Completion, ProviderError> {
        match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, provider.invoke(prompt, preset)).await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(format!(
                    "no response from {} within {:?}",
                    provider.name(),
                    limit
                ))),
            },
            None => provider.invoke(prompt, preset).await,
        }
    }

    /// Records the failure against the breaker when it reflects upstream
    /// ill-health, and shapes the error for the caller: service failures are
    /// masked behind a generic unavailability message, fatal ones propagate
    /// with original detail.
    fn conclude_failure(&self, original: ProviderError, class: Classification) -> InvokeError {
        if class.kind.is_service_failure() {
            self.breaker.record_failure(Some(class.backoff));
            let retry_at = self
                .breaker
                .status()
                .next_retry_time
                .unwrap_or_else(|| Instant::now() + class.backoff);
            InvokeError::Unavailable { retry_at }
        } else {
            InvokeError::Provider(original)
        }
    }
}

/// Strips Markdown-style code-fence delimiters wrapping a structured payload.
fn strip_delimiters(raw: &str) -> &str {
    let text = raw.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // The opening fence may carry a language tag on its own line.
    let inner = match inner.split_once('\n') {
        Some((tag, rest)) if !tag.contains('{') && !tag.contains('[') => rest,
        _ => inner,
    };
    inner.trim()
}
