//! `tally-engine` — the event-sourced ledger engine.
//!
//! The pieces, leaf-first: [`projection`] folds a log into a balance,
//! [`processor`] serializes mutations per ledger, [`service`] maps ledger
//! identifiers to processors and is the seam the transport layer calls into,
//! and [`read_model`] maintains a balance cache fed from committed events.

pub mod processor;
pub mod projection;
pub mod read_model;
pub mod service;


pub use processor::TransactionProcessor;
pub use projection::{Projection, project};
pub use read_model::{BalanceReadModel, ReadModelError};
pub use service::{DEFAULT_INITIAL_BALANCE, LedgerService, LedgerSummary};
