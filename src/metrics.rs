//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Pipeline metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub requests_total: IntCounter,
    pub requests_success: IntCounter,
    pub requests_failed: IntCounter,
    pub submissions_total: IntCounter,
    pub decode_format: IntCounterVec,
    pub errors_by_category: IntCounterVec,
    pub confirmation_outcomes: IntCounterVec,

    // Histograms
    pub stage_latency: HistogramVec,
    pub request_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounter::with_opts(Opts::new(
            "swap_signer_requests_total",
            "Total number of signing requests received",
        ))?;

        let requests_success = IntCounter::with_opts(Opts::new(
            "swap_signer_requests_success",
            "Requests that produced a signature without an on-chain error",
        ))?;

        let requests_failed = IntCounter::with_opts(Opts::new(
            "swap_signer_requests_failed",
            "Requests that ended in an error or an on-chain failure",
        ))?;

        let submissions_total = IntCounter::with_opts(Opts::new(
            "swap_signer_submissions_total",
            "Transactions accepted by the node",
        ))?;

        let decode_format = IntCounterVec::new(
            Opts::new("swap_signer_decoded_total", "Decoded transactions by wire format"),
            &["format"],
        )?;

        let errors_by_category = IntCounterVec::new(
            Opts::new("swap_signer_errors_total", "Pipeline errors by category"),
            &["category"],
        )?;

        let confirmation_outcomes = IntCounterVec::new(
            Opts::new(
                "swap_signer_confirmation_outcomes_total",
                "Terminal confirmation outcomes",
            ),
            &["outcome"],
        )?;

        let stage_latency = HistogramVec::new(
            HistogramOpts::new("swap_signer_stage_latency_seconds", "Pipeline stage latency")
                .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0]),
            &["stage"],
        )?;

        let request_latency = Histogram::with_opts(
            HistogramOpts::new("swap_signer_request_latency_seconds", "End-to-end request latency")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(requests_success.clone()))?;
        registry.register(Box::new(requests_failed.clone()))?;
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(decode_format.clone()))?;
        registry.register(Box::new(errors_by_category.clone()))?;
        registry.register(Box::new(confirmation_outcomes.clone()))?;
        registry.register(Box::new(stage_latency.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            requests_success,
            requests_failed,
            submissions_total,
            decode_format,
            errors_by_category,
            confirmation_outcomes,
            stage_latency,
            request_latency,
        })
    }

    pub fn record_error(&self, category: &str) {
        self.errors_by_category.with_label_values(&[category]).inc();
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.confirmation_outcomes.with_label_values(&[outcome]).inc();
    }

    /// Prometheus text exposition of everything registered
    pub fn export_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Timer helper for measuring stage duration
pub struct Timer {
    start: Instant,
    stage: &'static str,
}

impl Timer {
    pub fn new(stage: &'static str) -> Self {
        Self {
            start: Instant::now(),
            stage,
        }
    }

    /// Finish the timer and record into the stage histogram
    pub fn finish(self, metrics: &Metrics) -> u64 {
        let elapsed = self.start.elapsed();
        metrics
            .stage_latency
            .with_label_values(&[self.stage])
            .observe(elapsed.as_secs_f64());
        elapsed.as_millis() as u64
    }
}
