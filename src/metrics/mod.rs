//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Chain connection status and observed head
//! - Logs received and pipeline outcomes
//! - Messages sent
//! - Pipeline latency

use crate::coordination::Outcome;
use crate::error::{RelayerError, RelayerResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

lazy_static! {
    // Chain metrics
    pub static ref CHAIN_CONNECTED: GaugeVec = register_gauge_vec!(
        "xchain_chain_connected",
        "Chain connection status (1=connected, 0=disconnected)",
        &["chain"]
    ).unwrap();

    pub static ref CHAIN_HEAD: GaugeVec = register_gauge_vec!(
        "xchain_chain_head_block",
        "Head block at the configured safety confidence",
        &["chain"]
    ).unwrap();

    // Pipeline metrics
    pub static ref LOGS_RECEIVED: CounterVec = register_counter_vec!(
        "xchain_logs_received_total",
        "Ledger logs delivered to pipelines",
        &["chain"]
    ).unwrap();

    pub static ref OUTCOMES: CounterVec = register_counter_vec!(
        "xchain_pipeline_outcomes_total",
        "Terminal pipeline outcomes",
        &["chain", "outcome", "reason"]
    ).unwrap();

    pub static ref MESSAGES_SENT: CounterVec = register_counter_vec!(
        "xchain_messages_sent_total",
        "Reports submitted per route",
        &["source", "destination"]
    ).unwrap();

    pub static ref PIPELINE_LATENCY: HistogramVec = register_histogram_vec!(
        "xchain_pipeline_latency_seconds",
        "Time from log delivery to terminal outcome",
        &["chain"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0]
    ).unwrap();

    // Health metrics
    pub static ref HEALTH_CHECKS: CounterVec = register_counter_vec!(
        "xchain_health_checks_total",
        "Total health check rounds",
        &[]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> RelayerResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| RelayerError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Text exposition of every registered metric
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

// Helper functions to record metrics

pub fn record_chain_health(chain: &str, healthy: bool) {
    CHAIN_CONNECTED
        .with_label_values(&[chain])
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_chain_head(chain: &str, block_number: u64) {
    CHAIN_HEAD.with_label_values(&[chain]).set(block_number as f64);
}

pub fn record_log_received(chain: &str) {
    LOGS_RECEIVED.with_label_values(&[chain]).inc();
}

pub fn record_outcome(chain: &str, outcome: &Outcome) {
    OUTCOMES
        .with_label_values(&[chain, outcome.label(), outcome.reason()])
        .inc();
}

pub fn record_message_sent(source: &str, destination: &str) {
    MESSAGES_SENT.with_label_values(&[source, destination]).inc();
}

pub fn record_pipeline_latency(chain: &str, elapsed: Duration) {
    PIPELINE_LATENCY
        .with_label_values(&[chain])
        .observe(elapsed.as_secs_f64());
}

pub fn record_health_check() {
    HEALTH_CHECKS.with_label_values(&[]).inc();
}
