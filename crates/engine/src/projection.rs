//! Balance projection: fold a ledger's event stream into its current balance.

use tally_core::{LedgerError, LedgerId, LedgerResult, Money};
use tally_events::{LedgerEvent, StoredEvent};

/// Result of replaying a ledger's full event stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Projection {
    pub balance: Money,
    pub last_sequence: u64,
}

/// Replay `events` into the current balance.
///
/// Pure and deterministic: replaying the same stream twice yields the same
/// result. The stream must be well-formed — `Created` at sequence 0, then
/// contiguous sequence numbers with credits and debits only. Anything else
/// means the log (or the writer) is corrupt and comes back as a fatal-class
/// error; a valid ledger can never produce it.
///
/// Calling this on a stream with zero events is a programming error
/// ([`LedgerError::EmptyLedger`]): every ledger has its creation event before
/// any projection is meaningful.
pub fn project(ledger_id: LedgerId, events: &[StoredEvent]) -> LedgerResult<Projection> {
    let Some(first) = events.first() else {
        return Err(LedgerError::EmptyLedger(ledger_id));
    };

    let mut balance = match first.event {
        LedgerEvent::Created { initial_balance } => initial_balance,
        _ => {
            return Err(LedgerError::storage(format!(
                "ledger {ledger_id}: stream does not begin with a creation event"
            )));
        }
    };
    if balance.is_negative() {
        return Err(LedgerError::storage(format!(
            "ledger {ledger_id}: negative opening balance {balance} in stream"
        )));
    }

    for (index, stored) in events.iter().enumerate() {
        if stored.sequence_number != index as u64 {
            return Err(LedgerError::SequenceConflict {
                expected: index as u64,
                actual: stored.sequence_number,
            });
        }
        if index == 0 {
            continue;
        }

        balance = match stored.event {
            LedgerEvent::Created { .. } => {
                return Err(LedgerError::storage(format!(
                    "ledger {ledger_id}: duplicate creation event at sequence {index}"
                )));
            }
            LedgerEvent::Credited { amount } => balance.checked_add(amount).ok_or_else(|| {
                LedgerError::storage(format!("ledger {ledger_id}: balance overflow on replay"))
            })?,
            LedgerEvent::Debited { amount } => {
                let next = balance.checked_sub(amount).ok_or_else(|| {
                    LedgerError::storage(format!("ledger {ledger_id}: balance underflow on replay"))
                })?;
                if next.is_negative() {
                    return Err(LedgerError::storage(format!(
                        "ledger {ledger_id}: replayed balance went negative at sequence {index}"
                    )));
                }
                next
            }
        };
    }

    Ok(Projection {
        balance,
        last_sequence: (events.len() - 1) as u64,
    })
}
