//! `tally-core` — domain foundation for the ledger engine.
//!
//! This crate contains **pure domain** primitives (no IO, no infrastructure
//! concerns): fixed-precision money, typed ledger identifiers, and the error
//! taxonomy shared by every layer above.

pub mod error;
pub mod id;
pub mod money;

pub use error::{LedgerError, LedgerResult};
pub use id::LedgerId;
pub use money::Money;
