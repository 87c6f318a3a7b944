//! Ledger events: one immutable record per state transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{LedgerId, Money};

/// A state transition of a single ledger.
///
/// Treat these as facts. They are append-only; no component mutates or
/// removes an event once it has been appended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// The ledger came into existence with this opening balance.
    Created { initial_balance: Money },
    /// The balance increased by `amount`.
    Credited { amount: Money },
    /// The balance decreased by `amount`.
    Debited { amount: Money },
}

impl LedgerEvent {
    /// Stable event name for durable backends and log lines.
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::Created { .. } => "ledger.created",
            LedgerEvent::Credited { .. } => "ledger.credited",
            LedgerEvent::Debited { .. } => "ledger.debited",
        }
    }
}

/// An event as persisted in a ledger's log.
///
/// The log assigns `sequence_number` (0 for the creation event, then +1 with
/// no gaps) and stamps `recorded_at` at append time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub ledger_id: LedgerId,
    /// Position in the ledger's stream; unique within the ledger.
    pub sequence_number: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}
