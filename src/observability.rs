//! Observability (metrics, tracing)

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, honoring `RUST_LOG` and defaulting to `info`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Pipeline counters, shared between the dispatcher and its caller
#[derive(Debug, Default)]
pub struct Metrics {
    requests_dispatched: AtomicU64,
    build_failures: AtomicU64,
    transport_failures: AtomicU64,
    responses_classified: AtomicU64,
    successes: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_dispatched(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_dispatched", "Metric incremented");
    }

    pub fn build_failed(&self) {
        self.build_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "build_failures", "Metric incremented");
    }

    pub fn transport_failed(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "transport_failures", "Metric incremented");
    }

    pub fn response_classified(&self, success: bool) {
        self.responses_classified.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "responses_classified", "Metric incremented");
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(counter = "successes", "Metric incremented");
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_dispatched: self.requests_dispatched.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            responses_classified: self.responses_classified.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_dispatched: u64,
    pub build_failures: u64,
    pub transport_failures: u64,
    pub responses_classified: u64,
    pub successes: u64,
}
