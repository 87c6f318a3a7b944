//! Ledger error taxonomy.
//!
//! Every failure here is deterministic and non-retryable: retrying the same
//! call cannot succeed without the caller changing its input (or, for
//! [`LedgerError::SequenceConflict`], without fixing a bug). The engine never
//! retries internally and never renders user-facing text — the transport
//! layer owns presentation.

use thiserror::Error;

use crate::id::LedgerId;
use crate::money::Money;

/// Result type used across the engine.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Caller supplied a non-positive or malformed amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A debit would drive the balance negative. Surfaced verbatim.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    /// No ledger is registered under this identifier.
    #[error("ledger not found: {0}")]
    LedgerNotFound(LedgerId),

    /// Identifier collision at creation.
    #[error("duplicate ledger: {0}")]
    DuplicateLedger(LedgerId),

    /// Expected next sequence number did not match the log.
    ///
    /// Under correct single-writer-per-ledger operation this is unreachable;
    /// observing it means the exclusivity mechanism is broken. Treat as
    /// fatal/alerting, never silently retry.
    #[error("sequence conflict: expected {expected}, log at {actual}")]
    SequenceConflict { expected: u64, actual: u64 },

    /// A projection was asked to replay a log with zero events.
    /// A ledger always has its creation event first, so this is a bug.
    #[error("ledger {0} has no events")]
    EmptyLedger(LedgerId),

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The durable log (or a guard around it) failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Errors that indicate engine corruption rather than caller mistakes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SequenceConflict { .. } | Self::EmptyLedger(_) | Self::Storage(_)
        )
    }
}
