//! Append-only, strictly ordered event log for one ledger.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use thiserror::Error;

use tally_core::{LedgerError, LedgerId};

use crate::event::{LedgerEvent, StoredEvent};

/// Event log operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// The caller's expected next sequence did not match the log's length.
    ///
    /// The processor serializes writes per ledger, so this check is defense
    /// in depth: seeing it fire means the exclusivity mechanism is broken.
    #[error("sequence conflict: expected {expected}, log at {actual}")]
    SequenceConflict { expected: u64, actual: u64 },

    /// The backing store failed (for the in-memory log: lock poisoning).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<EventLogError> for LedgerError {
    fn from(value: EventLogError) -> Self {
        match value {
            EventLogError::SequenceConflict { expected, actual } => {
                LedgerError::SequenceConflict { expected, actual }
            }
            EventLogError::Storage(msg) => LedgerError::Storage(msg),
        }
    }
}

/// Durable, ordered store of [`StoredEvent`]s for a single ledger.
///
/// Contract:
/// - `append` assigns the next sequence number (0 for the first event, +1
///   per event, no gaps) and fails with [`EventLogError::SequenceConflict`]
///   when `expected_sequence` does not match.
/// - Once `append` returns `Ok`, the event is visible to every subsequent
///   `read_all`, including after a crash/restart for durable backends. No
///   write is acknowledged before it is durable.
/// - `read_all` is restartable: a fresh read always starts at sequence 0.
pub trait EventLog: Send + Sync {
    /// Append one event at `expected_sequence`.
    fn append(
        &self,
        event: LedgerEvent,
        expected_sequence: u64,
    ) -> Result<StoredEvent, EventLogError>;

    /// The full stream, ordered by sequence number from 0.
    fn read_all(&self) -> Result<Vec<StoredEvent>, EventLogError>;
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn append(
        &self,
        event: LedgerEvent,
        expected_sequence: u64,
    ) -> Result<StoredEvent, EventLogError> {
        (**self).append(event, expected_sequence)
    }

    fn read_all(&self) -> Result<Vec<StoredEvent>, EventLogError> {
        (**self).read_all()
    }
}

/// In-memory event log.
///
/// The reference backend for tests/dev; durable backends implement the same
/// trait. One instance holds exactly one ledger's stream, so logs for
/// different ledgers share no state at all.
#[derive(Debug)]
pub struct InMemoryEventLog {
    ledger_id: LedgerId,
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryEventLog {
    pub fn new(ledger_id: LedgerId) -> Self {
        Self {
            ledger_id,
            events: RwLock::new(Vec::new()),
        }
    }
}

impl EventLog for InMemoryEventLog {
    fn append(
        &self,
        event: LedgerEvent,
        expected_sequence: u64,
    ) -> Result<StoredEvent, EventLogError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| EventLogError::Storage("event log lock poisoned".to_string()))?;

        let actual = events.len() as u64;
        if expected_sequence != actual {
            return Err(EventLogError::SequenceConflict {
                expected: expected_sequence,
                actual,
            });
        }

        let stored = StoredEvent {
            ledger_id: self.ledger_id,
            sequence_number: actual,
            recorded_at: Utc::now(),
            event,
        };
        events.push(stored);

        tracing::debug!(
            ledger_id = %self.ledger_id,
            sequence = stored.sequence_number,
            event = stored.event.event_type(),
            "appended event"
        );

        Ok(stored)
    }

    fn read_all(&self) -> Result<Vec<StoredEvent>, EventLogError> {
        let events = self
            .events
            .read()
            .map_err(|_| EventLogError::Storage("event log lock poisoned".to_string()))?;
        Ok(events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Money;

    fn created(balance: i64) -> LedgerEvent {
        LedgerEvent::Created { initial_balance: Money::from_minor(balance) }
    }

    #[test]
    fn append_assigns_contiguous_sequence_numbers() {
        let log = InMemoryEventLog::new(LedgerId::new());
        let first = log.append(created(50_000), 0).unwrap();
        let second = log
            .append(LedgerEvent::Credited { amount: Money::from_minor(100) }, 1)
            .unwrap();

        assert_eq!(first.sequence_number, 0);
        assert_eq!(second.sequence_number, 1);
    }

    #[test]
    fn stale_expected_sequence_is_a_conflict() {
        let log = InMemoryEventLog::new(LedgerId::new());
        log.append(created(0), 0).unwrap();

        let err = log
            .append(LedgerEvent::Credited { amount: Money::from_minor(100) }, 0)
            .unwrap_err();
        assert_eq!(err, EventLogError::SequenceConflict { expected: 0, actual: 1 });

        // The failed append left the log unchanged.
        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[test]
    fn read_all_is_restartable_and_ordered() {
        let log = InMemoryEventLog::new(LedgerId::new());
        log.append(created(0), 0).unwrap();
        log.append(LedgerEvent::Credited { amount: Money::from_minor(1) }, 1).unwrap();
        log.append(LedgerEvent::Debited { amount: Money::from_minor(1) }, 2).unwrap();

        for _ in 0..2 {
            let events = log.read_all().unwrap();
            let sequences: Vec<u64> = events.iter().map(|e| e.sequence_number).collect();
            assert_eq!(sequences, vec![0, 1, 2]);
        }
    }

    #[test]
    fn appended_events_are_visible_through_a_shared_handle() {
        let log = Arc::new(InMemoryEventLog::new(LedgerId::new()));
        let handle: Arc<InMemoryEventLog> = Arc::clone(&log);

        handle.append(created(100), 0).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 1);
    }
}
