//! Failover Demo
//!
//! This demo shows:
//! 1. Implementing the `Provider` trait for two backends
//! 2. Wiring a circuit breaker with transition hooks
//! 3. Watching the invoker fail over and the circuit open and recover

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use failover_rs::{
    CircuitBreaker, Completion, GenerationPreset, HookRegistry, InvokeOptions, Provider,
    ProviderError, ResilientInvoker,
};

// A backend that goes through a scripted outage window.
struct WindowedBackend {
    name: &'static str,
    model: &'static str,
    outage: Range<u32>,
    calls: AtomicU32,
}

impl WindowedBackend {
    fn new(name: &'static str, model: &'static str, outage: Range<u32>) -> Self {
        Self {
            name,
            model,
            outage,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Provider for WindowedBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn invoke(
        &self,
        prompt: &str,
        _preset: &GenerationPreset,
    ) -> Result<Completion, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.outage.contains(&call) {
            return Err(ProviderError::unavailable("upstream returned 503"));
        }
        Ok(Completion {
            text: format!("{} answer to: {}", self.name, prompt),
            model: self.model.to_string(),
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let hooks = HookRegistry::new();
    hooks.set_on_open(|retry_at| {
        println!(
            ">> circuit OPENED, retrying in ~{}s",
            retry_at
                .saturating_duration_since(tokio::time::Instant::now())
                .as_secs()
        )
    });
    hooks.set_on_half_open(|| println!(">> circuit HALF-OPEN, trial call allowed"));
    hooks.set_on_close(|| println!(">> circuit CLOSED"));

    let breaker = CircuitBreaker::builder()
        .failure_threshold(3)
        .reset_timeout(Duration::from_secs(2))
        .hooks(hooks)
        .build();

    // The primary's outage outlasts the fallback's, so the demo walks
    // through failover, a fully open circuit, and probe-less recovery.
    let invoker = ResilientInvoker::builder()
        .primary(WindowedBackend::new("alpha", "alpha-xl", 3..12))
        .fallback(WindowedBackend::new("bravo", "bravo-s", 0..4))
        .breaker(breaker)
        .build();

    let preset = GenerationPreset {
        temperature: Some(0.7),
        ..GenerationPreset::default()
    };

    for attempt in 1..=16 {
        match invoker
            .invoke_text(
                "what is the score?",
                &preset,
                InvokeOptions::with_timeout(Duration::from_secs(5)),
            )
            .await
        {
            Ok((text, meta)) => println!(
                "attempt {:2}: {} [provider={} model={} fallback={}]",
                attempt, text, meta.provider, meta.model, meta.used_fallback
            ),
            Err(err) => println!(
                "attempt {:2}: failed ({}) [circuit={}]",
                attempt,
                err,
                invoker.circuit_status().state
            ),
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
    }
}
