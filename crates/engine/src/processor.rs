//! Per-ledger transaction processing — the concurrency boundary.

use std::sync::{Mutex, MutexGuard};

use tally_core::{LedgerError, LedgerId, LedgerResult, Money};
use tally_events::{EventBus, EventLog, LedgerEvent, StoredEvent};

use crate::projection::{Projection, project};

/// The single authority that turns an intent ("credit X", "debit X") into a
/// durable event for one ledger.
///
/// All mutations take the ledger's exclusive turn: project, validate and
/// append run under one lock acquisition, so two concurrent debits can never
/// both observe the same balance and overdraw (the classic lost-update
/// race). The order in which callers acquire the turn is the order reflected
/// in the log's sequence numbers. Different ledgers have independent
/// processors and never contend.
///
/// Committed events are appended first, then published on the bus — a
/// consumer that misses a publication can always rebuild from the log.
#[derive(Debug)]
pub struct TransactionProcessor<L, B> {
    ledger_id: LedgerId,
    log: L,
    bus: B,
    turn: Mutex<()>,
}

impl<L, B> TransactionProcessor<L, B>
where
    L: EventLog,
    B: EventBus<StoredEvent>,
{
    /// Initialize a new ledger: appends `Created` at sequence 0.
    ///
    /// The log must be empty; a non-empty log shows up as a sequence
    /// conflict.
    pub fn create(ledger_id: LedgerId, log: L, bus: B, initial_balance: Money) -> LedgerResult<Self> {
        if initial_balance.is_negative() {
            return Err(LedgerError::invalid_amount(format!(
                "initial balance must not be negative, got {initial_balance}"
            )));
        }

        let processor = Self {
            ledger_id,
            log,
            bus,
            turn: Mutex::new(()),
        };
        let stored = processor
            .log
            .append(LedgerEvent::Created { initial_balance }, 0)?;
        processor.publish(stored);

        tracing::info!(ledger_id = %ledger_id, balance = %initial_balance, "ledger created");
        Ok(processor)
    }

    pub fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    /// Increase the balance by `amount`. Returns the new balance.
    ///
    /// No idempotency key is modeled: two identical concurrent submissions
    /// (e.g. a retried network call) are recorded as two genuine credits.
    pub fn credit(&self, amount: Money) -> LedgerResult<Money> {
        self.require_positive(amount)?;

        let _turn = self.acquire_turn()?;
        let current = self.replay()?;
        let balance = current.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::invalid_amount(format!("credit of {amount} would overflow the balance"))
        })?;

        let stored = self
            .log
            .append(LedgerEvent::Credited { amount }, current.last_sequence + 1)?;
        self.publish(stored);

        tracing::debug!(ledger_id = %self.ledger_id, amount = %amount, balance = %balance, "credited");
        Ok(balance)
    }

    /// Decrease the balance by `amount`. Returns the new balance.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] when the debit would
    /// drive the balance negative, leaving the log untouched.
    pub fn debit(&self, amount: Money) -> LedgerResult<Money> {
        self.require_positive(amount)?;

        let _turn = self.acquire_turn()?;
        let current = self.replay()?;
        if amount > current.balance {
            return Err(LedgerError::InsufficientFunds {
                balance: current.balance,
                requested: amount,
            });
        }
        let balance = current.balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::storage(format!(
                "ledger {}: debit underflow despite funds check",
                self.ledger_id
            ))
        })?;

        let stored = self
            .log
            .append(LedgerEvent::Debited { amount }, current.last_sequence + 1)?;
        self.publish(stored);

        tracing::debug!(ledger_id = %self.ledger_id, amount = %amount, balance = %balance, "debited");
        Ok(balance)
    }

    /// Current balance, projected from the log. Read-only: takes no turn.
    pub fn balance(&self) -> LedgerResult<Money> {
        Ok(self.replay()?.balance)
    }

    /// The ledger's full audit trail, ordered by sequence number.
    pub fn history(&self) -> LedgerResult<Vec<StoredEvent>> {
        Ok(self.log.read_all()?)
    }

    fn require_positive(&self, amount: Money) -> LedgerResult<()> {
        if amount.is_positive() {
            Ok(())
        } else {
            Err(LedgerError::invalid_amount(format!(
                "amount must be strictly positive, got {amount}"
            )))
        }
    }

    fn acquire_turn(&self) -> LedgerResult<MutexGuard<'_, ()>> {
        self.turn
            .lock()
            .map_err(|_| LedgerError::storage(format!("ledger {}: turn lock poisoned", self.ledger_id)))
    }

    fn replay(&self) -> LedgerResult<Projection> {
        let events = self.log.read_all()?;
        project(self.ledger_id, &events)
    }

    fn publish(&self, stored: StoredEvent) {
        // The event is already durable; a lost publication only delays read
        // models, which can rebuild from the log.
        if let Err(e) = self.bus.publish(stored) {
            tracing::warn!(
                ledger_id = %self.ledger_id,
                sequence = stored.sequence_number,
                "failed to publish committed event: {e:?}"
            );
        }
    }
}
