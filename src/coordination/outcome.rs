//! Terminal outcomes of processing one observed log

use crate::chain::TxStatus;
use crate::events::IntentKind;

use ethers::types::H256;
use std::fmt;

/// Why a log was deliberately not relayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    LogRemoved,
    NoTopics,
    UnsupportedEvent,
    UnknownDestination,
    PreflightFailed,
}

impl SkipReason {
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::LogRemoved => "log_removed",
            SkipReason::NoTopics => "no_topics",
            SkipReason::UnsupportedEvent => "unsupported_event",
            SkipReason::UnknownDestination => "unknown_destination",
            SkipReason::PreflightFailed => "preflight_failed",
        }
    }
}

/// Why processing a log failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    DecodeFailed,
    HandlerException,
}

impl ErrorReason {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorReason::DecodeFailed => "decode_failed",
            ErrorReason::HandlerException => "handler_exception",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sent {
        detail: IntentKind,
        status: TxStatus,
        tx_hash: H256,
    },
    Skipped(SkipReason),
    Error(ErrorReason),
}

impl Outcome {
    /// `sent`, `skipped` or `error`
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Sent { .. } => "sent",
            Outcome::Skipped(_) => "skipped",
            Outcome::Error(_) => "error",
        }
    }

    /// Intent name for sends, reason code otherwise
    pub fn reason(&self) -> &'static str {
        match self {
            Outcome::Sent { detail, .. } => detail.name(),
            Outcome::Skipped(reason) => reason.code(),
            Outcome::Error(reason) => reason.code(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Sent {
                detail,
                status,
                tx_hash,
            } => write!(f, "sent({}, {}, {:?})", detail.name(), status, tx_hash),
            Outcome::Skipped(reason) => write!(f, "skipped({})", reason.code()),
            Outcome::Error(reason) => write!(f, "error({})", reason.code()),
        }
    }
}
