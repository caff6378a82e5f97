//! Adapters: in-memory implementations of the commit engine and form cache.

pub mod cache;
pub mod ledger;

pub use cache::InMemoryFormCache;
pub use ledger::{InMemoryLedger, LedgerEntry, DEFAULT_MAX_TX_BYTES};
