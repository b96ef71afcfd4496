//! Append-Only Credit Ledger
//!
//! The authoritative record every derived view (balance, tier,
//! leaderboard) folds over. Entries are immutable; corrections are
//! offsetting entries.

pub mod balance;
pub mod store;
pub mod transaction;

pub use balance::{project, replay_holds, Balance};
pub use store::LedgerStore;
pub use transaction::{idempotency_key, CreditTransaction, TransactionKind};
