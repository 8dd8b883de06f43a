//! # failover-rs
//!
//! A production-grade, lock-efficient circuit breaker and multi-provider
//! failover layer for unreliable text-generation backends.
//!
//! This library decides *whether* and *through which backend* a generation
//! request may be attempted, and how to interpret failure. It does not parse
//! messages, persist state, or decide what request to send — those belong to
//! the layers consuming it.
//!
//! ## What it does
//!
//! - **Circuit breaking**: a [`CircuitBreaker`] gates calls through the
//!   classic Closed/Open/HalfOpen state machine, with optional health-probe
//!   driven recovery while open.
//! - **Failover**: a [`ResilientInvoker`] calls a primary [`Provider`] and,
//!   on failure, an optional fallback.
//! - **Failure classification**: provider adapters report structured
//!   [`ProviderError`]s, classified into fatal, transient, and rate-limited
//!   failures. Only the latter two count against the circuit; fatal failures
//!   would recur regardless of upstream health and never open it.
//! - **Result validation**: structured call sites decode the provider's
//!   textual output (stripping any code-fence wrapping) into their own shape;
//!   a decode failure is fatal, never a service failure.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use failover_rs::{
//!     Completion, GenerationPreset, InvokeOptions, Provider, ProviderError, ResilientInvoker,
//! };
//!
//! struct EchoBackend;
//!
//! #[async_trait]
//! impl Provider for EchoBackend {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     async fn invoke(
//!         &self,
//!         prompt: &str,
//!         _preset: &GenerationPreset,
//!     ) -> Result<Completion, ProviderError> {
//!         Ok(Completion {
//!             text: prompt.to_string(),
//!             model: "echo-1".to_string(),
//!         })
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let invoker = ResilientInvoker::builder().primary(EchoBackend).build();
//!
//!     let (text, meta) = invoker
//!         .invoke_text("hello", &GenerationPreset::default(), InvokeOptions::default())
//!         .await
//!         .unwrap();
//!     println!("{} (served by {})", text, meta.provider);
//! }
//! ```
//!
//! ## Failover and health-driven recovery
//!
//! Configure a fallback provider and a health probe through the builders:
//!
//! ```rust,ignore
//! let breaker = CircuitBreaker::builder()
//!     .failure_threshold(3)
//!     .reset_timeout(Duration::from_secs(30))
//!     .health_probe(PingProbe::new(endpoint))
//!     .build();
//!
//! let invoker = ResilientInvoker::builder()
//!     .primary(primary_backend)
//!     .fallback(secondary_backend)
//!     .breaker(breaker)
//!     .build();
//! ```
//!
//! While the circuit is open, callers get an immediate
//! [`InvokeError::CircuitOpen`] carrying the estimated recovery time; no
//! provider is touched. With a probe configured, a detached task checks the
//! dependency out-of-band and half-opens the circuit when it reports healthy.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod classify;
mod config;
mod error;
mod hook;
mod invoker;
pub mod prelude;
mod provider;
mod state;

// Re-exports
pub use breaker::CircuitBreaker;
pub use classify::{Classification, FailureClassifier, FailureKind};
pub use config::{BreakerBuilder, InvokerBuilder};
pub use error::{InvokeError, InvokeResult};
pub use hook::HookRegistry;
pub use invoker::{InvocationMetadata, InvokeOptions, ResilientInvoker};
pub use provider::{Completion, GenerationPreset, HealthProbe, Provider, ProviderError};
pub use state::{CircuitStatus, State};
