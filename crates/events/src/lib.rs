//! `tally-events` — the event model and the append-only log contract.
//!
//! Events are facts: immutable once appended, ordered by a per-ledger
//! sequence number, and the only durable state in the system. Balances are
//! always derived from them, never stored as truth.

pub mod bus;
pub mod event;
pub mod log;

pub use bus::{EventBus, InMemoryBusError, InMemoryEventBus, Subscription};
pub use event::{LedgerEvent, StoredEvent};
pub use log::{EventLog, EventLogError, InMemoryEventLog};
