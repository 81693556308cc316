//! Relay engine: one independent pipeline per source chain
//!
//! Chains are registered once, before the engine runs, into a trigger table
//! mapping each chain to its log source and pipeline. Every chain gets a
//! listener task feeding a bounded channel and a worker task that takes the
//! logs to their outcomes strictly one at a time.

use super::pipeline::IntentPipeline;
use super::sink::OutcomeSink;
use crate::chain::{run_listener, LogSource};
use crate::error::{RelayerError, RelayerResult};

use ethers::types::Log;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tracing::info;

/// What runs for one source chain
#[derive(Clone)]
pub struct ChainTrigger {
    pub source: Arc<dyn LogSource>,
    pub pipeline: Arc<IntentPipeline>,
    pub poll_interval: Duration,
}

pub struct RelayEngine {
    triggers: Vec<(String, ChainTrigger)>,
    sink: Arc<dyn OutcomeSink>,
    channel_capacity: usize,
    shutdown: Arc<RwLock<bool>>,
}

impl RelayEngine {
    pub fn new(sink: Arc<dyn OutcomeSink>, channel_capacity: usize) -> Self {
        Self {
            triggers: Vec::new(),
            sink,
            channel_capacity: channel_capacity.max(1),
            shutdown: Arc::new(RwLock::new(false)),
        }
    }

    /// Register `chain`; each chain may be registered once
    pub fn register(&mut self, chain: impl Into<String>, trigger: ChainTrigger) -> RelayerResult<()> {
        let chain = chain.into();
        if self.triggers.iter().any(|(name, _)| *name == chain) {
            return Err(RelayerError::Config(format!(
                "Chain {} registered twice",
                chain
            )));
        }
        info!(chain = %chain, selector = trigger.pipeline.source().selector, "Registered chain pipeline");
        self.triggers.push((chain, trigger));
        Ok(())
    }

    pub fn chains(&self) -> Vec<&str> {
        self.triggers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Run every registered chain until [`RelayEngine::stop`]
    pub async fn run(&self) -> RelayerResult<()> {
        if self.triggers.is_empty() {
            return Err(RelayerError::Config("No chain pipelines registered".to_string()));
        }

        let mut handles = Vec::new();
        for (chain, trigger) in &self.triggers {
            let (tx, rx) = mpsc::channel(self.channel_capacity);

            handles.push(tokio::spawn(run_listener(
                chain.clone(),
                trigger.source.clone(),
                tx,
                trigger.poll_interval,
                self.shutdown.clone(),
            )));
            handles.push(tokio::spawn(run_worker(
                chain.clone(),
                trigger.pipeline.clone(),
                self.sink.clone(),
                rx,
            )));
        }

        info!("Relay engine started with {} chains", self.triggers.len());
        for result in futures::future::join_all(handles).await {
            result.map_err(|e| RelayerError::Internal(format!("Chain task failed: {}", e)))?;
        }
        info!("Relay engine stopped");
        Ok(())
    }

    /// Stop polling; queued logs are still processed
    pub async fn stop(&self) {
        *self.shutdown.write().await = true;
        info!("Relay engine shutdown initiated");
    }
}

/// Process a chain's logs in delivery order until its listener stops
async fn run_worker(
    chain: String,
    pipeline: Arc<IntentPipeline>,
    sink: Arc<dyn OutcomeSink>,
    mut rx: mpsc::Receiver<Log>,
) {
    while let Some(log) = rx.recv().await {
        let started = Instant::now();
        let outcome = pipeline.handle_log(&log).await;
        crate::metrics::record_pipeline_latency(&chain, started.elapsed());
        sink.record(&chain, &log, &outcome);
    }
}
