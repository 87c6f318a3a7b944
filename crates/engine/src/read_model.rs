//! Balance read model: a current-balance cache fed from committed events.
//!
//! The log is ground truth; this cache is disposable and rebuildable at any
//! time. Application is idempotent — the bus delivers at-least-once, so a
//! per-ledger sequence cursor skips anything already applied.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use thiserror::Error;

use tally_core::{LedgerId, Money};
use tally_events::{LedgerEvent, StoredEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadModelError {
    /// An event arrived with a gap after the last applied sequence.
    /// The model is behind and must be rebuilt from the log.
    #[error("event gap for ledger {ledger_id}: last applied {last}, received {received}")]
    SequenceGap {
        ledger_id: LedgerId,
        last: u64,
        received: u64,
    },

    /// The first event seen for a ledger was not its creation event.
    #[error("first event for ledger {0} is not a creation event")]
    MissingCreation(LedgerId),

    /// A creation event arrived for a ledger that already exists.
    #[error("unexpected creation event for existing ledger {0}")]
    UnexpectedCreation(LedgerId),

    /// Applying an event overflowed the cached balance. Committed events
    /// cannot do this; seeing it means the feed is corrupt.
    #[error("balance overflow for ledger {0}")]
    Overflow(LedgerId),

    #[error("read model lock poisoned")]
    Poisoned,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct LedgerState {
    balance: Money,
    last_sequence: u64,
}

/// In-memory per-ledger balance cache.
#[derive(Debug, Default)]
pub struct BalanceReadModel {
    state: RwLock<HashMap<LedgerId, LedgerState>>,
}

impl BalanceReadModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a full replay of one or more ledgers' streams.
    pub fn rebuild(
        events: impl IntoIterator<Item = StoredEvent>,
    ) -> Result<Self, ReadModelError> {
        let model = Self::new();
        for stored in events {
            model.apply(&stored)?;
        }
        Ok(model)
    }

    /// Apply one committed event.
    ///
    /// Duplicates (sequence at or below the cursor) are a no-op; gaps are an
    /// error because silently skipping one would corrupt the cached balance.
    pub fn apply(&self, stored: &StoredEvent) -> Result<(), ReadModelError> {
        let mut state = self.state.write().map_err(|_| ReadModelError::Poisoned)?;

        match state.entry(stored.ledger_id) {
            Entry::Vacant(slot) => {
                let LedgerEvent::Created { initial_balance } = stored.event else {
                    return Err(ReadModelError::MissingCreation(stored.ledger_id));
                };
                if stored.sequence_number != 0 {
                    return Err(ReadModelError::SequenceGap {
                        ledger_id: stored.ledger_id,
                        last: 0,
                        received: stored.sequence_number,
                    });
                }
                slot.insert(LedgerState { balance: initial_balance, last_sequence: 0 });
            }
            Entry::Occupied(mut entry) => {
                let ledger = entry.get_mut();
                if stored.sequence_number <= ledger.last_sequence {
                    // At-least-once delivery: already applied.
                    tracing::debug!(
                        ledger_id = %stored.ledger_id,
                        sequence = stored.sequence_number,
                        "skipping duplicate event"
                    );
                    return Ok(());
                }
                if stored.sequence_number != ledger.last_sequence + 1 {
                    return Err(ReadModelError::SequenceGap {
                        ledger_id: stored.ledger_id,
                        last: ledger.last_sequence,
                        received: stored.sequence_number,
                    });
                }

                ledger.balance = match stored.event {
                    LedgerEvent::Created { .. } => {
                        return Err(ReadModelError::UnexpectedCreation(stored.ledger_id));
                    }
                    LedgerEvent::Credited { amount } => ledger
                        .balance
                        .checked_add(amount)
                        .ok_or(ReadModelError::Overflow(stored.ledger_id))?,
                    LedgerEvent::Debited { amount } => ledger
                        .balance
                        .checked_sub(amount)
                        .ok_or(ReadModelError::Overflow(stored.ledger_id))?,
                };
                ledger.last_sequence = stored.sequence_number;
            }
        }

        Ok(())
    }

    /// Cached balance for `id`, if the ledger has been seen.
    pub fn balance(&self, id: LedgerId) -> Option<Money> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.get(&id).map(|s| s.balance))
    }

    /// Last applied sequence number for `id`.
    pub fn cursor(&self, id: LedgerId) -> Option<u64> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.get(&id).map(|s| s.last_sequence))
    }
}
