//! Ledger service facade: the seam the transport layer calls into.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use tally_core::{LedgerError, LedgerId, LedgerResult, Money};
use tally_events::{EventBus, InMemoryEventBus, InMemoryEventLog, StoredEvent, Subscription};

use crate::processor::TransactionProcessor;

/// Opening balance used when the caller does not supply one: 500.00.
pub const DEFAULT_INITIAL_BALANCE: Money = Money::from_minor(50_000);

type Processor = TransactionProcessor<Arc<InMemoryEventLog>, Arc<InMemoryEventBus<StoredEvent>>>;

/// Identifier plus current balance — the shape the transport layer renders.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub id: LedgerId,
    pub balance: Money,
}

/// Thin dispatch over per-ledger processors.
///
/// The registry mapping identifiers to processors is process-wide shared
/// state with its own guard, independent of any per-ledger turn: creating
/// ledger B never blocks an in-flight operation on ledger A. No business
/// logic lives here beyond routing.
pub struct LedgerService {
    ledgers: RwLock<HashMap<LedgerId, Arc<Processor>>>,
    bus: Arc<InMemoryEventBus<StoredEvent>>,
}

impl LedgerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a consumer (e.g. a read model) to the committed-event feed.
    pub fn subscribe(&self) -> Subscription<StoredEvent> {
        self.bus.subscribe()
    }

    /// Create a ledger with a fresh identifier.
    ///
    /// `initial_balance` defaults to [`DEFAULT_INITIAL_BALANCE`].
    pub fn create_ledger(&self, initial_balance: Option<Money>) -> LedgerResult<LedgerSummary> {
        self.create_ledger_with_id(
            LedgerId::new(),
            initial_balance.unwrap_or(DEFAULT_INITIAL_BALANCE),
        )
    }

    /// Create a ledger under a caller-chosen identifier.
    ///
    /// Identifier generation is external to the registry, so collisions must
    /// be checked even though a v7 generator makes them practically
    /// unreachable: an already-registered id fails with
    /// [`LedgerError::DuplicateLedger`].
    pub fn create_ledger_with_id(
        &self,
        id: LedgerId,
        initial_balance: Money,
    ) -> LedgerResult<LedgerSummary> {
        // The identifier is claimed before the processor exists: building it
        // inside the vacant slot guarantees a racing loser never appends and
        // never publishes, so the bus carries exactly one `Created` per id.
        match self.write_ledgers()?.entry(id) {
            Entry::Occupied(_) => return Err(LedgerError::DuplicateLedger(id)),
            Entry::Vacant(slot) => {
                let log = Arc::new(InMemoryEventLog::new(id));
                let processor = Arc::new(Processor::create(
                    id,
                    log,
                    Arc::clone(&self.bus),
                    initial_balance,
                )?);
                slot.insert(processor);
            }
        }

        tracing::info!(ledger_id = %id, balance = %initial_balance, "registered ledger");
        Ok(LedgerSummary { id, balance: initial_balance })
    }

    /// Identifier and current balance for an existing ledger.
    pub fn get_ledger(&self, id: LedgerId) -> LedgerResult<LedgerSummary> {
        let processor = self.processor(id)?;
        Ok(LedgerSummary { id, balance: processor.balance()? })
    }

    /// Record a credit; returns the new balance.
    pub fn credit(&self, id: LedgerId, amount: Money) -> LedgerResult<Money> {
        self.processor(id)?.credit(amount)
    }

    /// Record a debit; returns the new balance.
    pub fn debit(&self, id: LedgerId, amount: Money) -> LedgerResult<Money> {
        self.processor(id)?.debit(amount)
    }

    /// The ledger's full audit trail.
    pub fn history(&self, id: LedgerId) -> LedgerResult<Vec<StoredEvent>> {
        self.processor(id)?.history()
    }

    fn processor(&self, id: LedgerId) -> LedgerResult<Arc<Processor>> {
        self.read_ledgers()?
            .get(&id)
            .cloned()
            .ok_or(LedgerError::LedgerNotFound(id))
    }

    fn read_ledgers(&self) -> LedgerResult<RwLockReadGuard<'_, HashMap<LedgerId, Arc<Processor>>>> {
        self.ledgers
            .read()
            .map_err(|_| LedgerError::storage("ledger registry lock poisoned"))
    }

    fn write_ledgers(
        &self,
    ) -> LedgerResult<RwLockWriteGuard<'_, HashMap<LedgerId, Arc<Processor>>>> {
        self.ledgers
            .write()
            .map_err(|_| LedgerError::storage("ledger registry lock poisoned"))
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self {
            ledgers: RwLock::new(HashMap::new()),
            bus: Arc::new(InMemoryEventBus::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_events::LedgerEvent;

    #[test]
    fn create_without_argument_opens_at_500() {
        let service = LedgerService::new();
        let summary = service.create_ledger(None).unwrap();
        assert_eq!(summary.balance, Money::from_minor(50_000));
        assert_eq!(summary.balance.to_string(), "500.00");
    }

    #[test]
    fn get_ledger_reflects_mutations() {
        let service = LedgerService::new();
        let summary = service.create_ledger(Some(Money::from_minor(10_000))).unwrap();

        service.credit(summary.id, Money::from_minor(2_000)).unwrap();
        service.debit(summary.id, Money::from_minor(500)).unwrap();

        let fetched = service.get_ledger(summary.id).unwrap();
        assert_eq!(fetched, LedgerSummary { id: summary.id, balance: Money::from_minor(11_500) });
    }

    #[test]
    fn unknown_ledger_is_not_found() {
        let service = LedgerService::new();
        let id = LedgerId::new();

        assert_eq!(service.get_ledger(id).unwrap_err(), LedgerError::LedgerNotFound(id));
        assert_eq!(
            service.credit(id, Money::from_minor(1)).unwrap_err(),
            LedgerError::LedgerNotFound(id)
        );
        assert_eq!(
            service.debit(id, Money::from_minor(1)).unwrap_err(),
            LedgerError::LedgerNotFound(id)
        );
        assert_eq!(service.history(id).unwrap_err(), LedgerError::LedgerNotFound(id));
    }

    #[test]
    fn identifier_collision_is_rejected() {
        let service = LedgerService::new();
        let id = LedgerId::new();

        service.create_ledger_with_id(id, Money::from_minor(100)).unwrap();
        let err = service.create_ledger_with_id(id, Money::from_minor(100)).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateLedger(id));

        // The surviving ledger is the first one, untouched.
        assert_eq!(service.get_ledger(id).unwrap().balance, Money::from_minor(100));
        assert_eq!(service.history(id).unwrap().len(), 1);
    }

    #[test]
    fn history_is_the_ordered_audit_trail() {
        let service = LedgerService::new();
        let summary = service.create_ledger(None).unwrap();
        service.credit(summary.id, Money::from_minor(15_000)).unwrap();
        service.debit(summary.id, Money::from_minor(20_000)).unwrap();

        let history = service.history(summary.id).unwrap();
        let kinds: Vec<&str> = history.iter().map(|e| e.event.event_type()).collect();
        assert_eq!(kinds, vec!["ledger.created", "ledger.credited", "ledger.debited"]);
        for (i, stored) in history.iter().enumerate() {
            assert_eq!(stored.sequence_number, i as u64);
            assert_eq!(stored.ledger_id, summary.id);
        }
        assert_eq!(
            history[1].event,
            LedgerEvent::Credited { amount: Money::from_minor(15_000) }
        );
    }

    #[test]
    fn create_credit_debit_then_overdraw_scenario() {
        let service = LedgerService::new();
        let summary = service.create_ledger(None).unwrap();
        assert_eq!(summary.balance.to_string(), "500.00");

        let balance = service.credit(summary.id, "150.00".parse().unwrap()).unwrap();
        assert_eq!(balance.to_string(), "650.00");

        let balance = service.debit(summary.id, "200.00".parse().unwrap()).unwrap();
        assert_eq!(balance.to_string(), "450.00");

        let err = service.debit(summary.id, "1000.00".parse().unwrap()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(service.get_ledger(summary.id).unwrap().balance.to_string(), "450.00");
    }
}
