//! Per-chain intent pipeline
//!
//! Takes one observed ledger log to a terminal [`Outcome`]:
//! filter, decode, resolve the destination, build the message, preflight,
//! then submit the report. Faults after decoding, including panics, end in
//! `error(handler_exception)` and never escape the pipeline.

use super::builder::build_message;
use super::outcome::{ErrorReason, Outcome, SkipReason};
use super::preflight::Preflight;
use crate::chain::{ChainDirectory, ChainEntry, ContractCaller, ReportWriter};
use crate::codec::encode_execute_send;
use crate::error::RelayerResult;
use crate::events::{EventParser, Intent};

use ethers::types::Log;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub struct IntentPipeline {
    source: ChainEntry,
    directory: Arc<ChainDirectory>,
    caller: Arc<dyn ContractCaller>,
    writer: Arc<dyn ReportWriter>,
    preflight: Preflight,
    send_gas_limit: Option<u64>,
    dest_gas_limit: Option<u64>,
    parser: EventParser,
}

impl IntentPipeline {
    pub fn new(
        source: ChainEntry,
        directory: Arc<ChainDirectory>,
        caller: Arc<dyn ContractCaller>,
        writer: Arc<dyn ReportWriter>,
        preflight: Preflight,
    ) -> Self {
        Self {
            source,
            directory,
            caller,
            writer,
            preflight,
            send_gas_limit: None,
            dest_gas_limit: None,
            parser: EventParser::new(),
        }
    }

    /// Gas limit passed to the report writer
    pub fn with_send_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.send_gas_limit = gas_limit;
        self
    }

    /// Destination execution gas limit encoded in extra args
    pub fn with_dest_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.dest_gas_limit = gas_limit;
        self
    }

    pub fn source(&self) -> &ChainEntry {
        &self.source
    }

    /// Process one log to its terminal outcome
    pub async fn handle_log(&self, log: &Log) -> Outcome {
        let span = info_span!(
            "intent",
            chain = %self.source.name,
            correlation_id = %Uuid::new_v4(),
            tx_hash = ?log.transaction_hash,
        );
        async move {
            let outcome = self.process(log).await;
            debug!(%outcome, "Log processed");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn process(&self, log: &Log) -> Outcome {
        if log.removed == Some(true) {
            return Outcome::Skipped(SkipReason::LogRemoved);
        }
        if log.topics.is_empty() {
            return Outcome::Skipped(SkipReason::NoTopics);
        }

        let intent = match self.parser.parse_log(log) {
            Ok(Some(intent)) => intent,
            Ok(None) => return Outcome::Skipped(SkipReason::UnsupportedEvent),
            Err(e) => {
                warn!(error = %e, "Failed to decode intent");
                return Outcome::Error(ErrorReason::DecodeFailed);
            }
        };

        match AssertUnwindSafe(self.relay(&intent)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(
                    error = %e,
                    kind = %intent.kind,
                    retryable = e.is_retryable(),
                    alert = e.should_alert(),
                    "Failed to relay intent"
                );
                Outcome::Error(ErrorReason::HandlerException)
            }
            Err(_) => {
                error!(kind = %intent.kind, "Relay panicked");
                Outcome::Error(ErrorReason::HandlerException)
            }
        }
    }

    async fn relay(&self, intent: &Intent) -> RelayerResult<Outcome> {
        let Some(destination) = self.directory.get(intent.destination_chain) else {
            info!(
                destination = intent.destination_chain,
                "Destination chain is not configured"
            );
            return Ok(Outcome::Skipped(SkipReason::UnknownDestination));
        };

        let message = build_message(intent, &self.source, destination, self.dest_gas_limit);

        if let Some(shortfall) = self
            .preflight
            .run(
                self.caller.as_ref(),
                &self.source,
                destination.selector,
                &message,
            )
            .await?
        {
            warn!(
                token = ?shortfall.token,
                available = %shortfall.available,
                required = %shortfall.required,
                "Ledger cannot fund the send"
            );
            return Ok(Outcome::Skipped(SkipReason::PreflightFailed));
        }

        let report = encode_execute_send(destination.selector, &message);
        let receipt = self
            .writer
            .write_report(self.source.contracts.ledger, report, self.send_gas_limit)
            .await?;

        info!(
            kind = %intent.kind,
            destination = %destination.name,
            status = %receipt.status,
            tx_hash = ?receipt.tx_hash,
            "Report submitted"
        );
        crate::metrics::record_message_sent(&self.source.name, &destination.name);

        Ok(Outcome::Sent {
            detail: intent.kind,
            status: receipt.status,
            tx_hash: receipt.tx_hash,
        })
    }
}
