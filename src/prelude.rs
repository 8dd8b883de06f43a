//! Re-exports the types a typical integrator needs.
//!
//! # Example
//! ```rust,no_run
//! use failover_rs::prelude::*;
//! ```

pub use crate::{
    CircuitBreaker, CircuitStatus, Completion, GenerationPreset, HealthProbe, InvocationMetadata,
    InvokeError, InvokeOptions, InvokeResult, Provider, ProviderError, ResilientInvoker, State,
};
