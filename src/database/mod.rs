//! PostgreSQL Persistence Module
//!
//! Write-through durability for the ledger and flagged plate aggregates.
//! The in-memory engine state stays authoritative on the hot path.

pub mod ledger;
pub mod plates;
pub mod pool;

pub use ledger::LedgerRepository;
pub use plates::PlateRepository;
pub use pool::DatabasePool;
