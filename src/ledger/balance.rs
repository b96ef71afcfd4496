//! Balance Projection
//!
//! Pure folds from a user's transaction history into the four balance
//! figures. The cache callers keep is an optimization only; everything
//! here is re-derivable from the ledger at any time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ledger::transaction::{CreditTransaction, TransactionKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// lifetime − redeemed − pending. Never negative: write paths that
    /// would drive it negative fail before appending.
    pub available: i64,
    /// Withdrawal debits awaiting external execution.
    pub pending: i64,
    /// Total earned over the account's life. Reversals restore a debit,
    /// they do not earn.
    pub lifetime: i64,
    /// Withdrawal debits the external payment collaborator has settled.
    pub redeemed: i64,
}

/// Fold a user's transactions into a `Balance`.
///
/// `settled_payouts` carries the payout ids the external collaborator has
/// executed; a debit whose payout id appears there counts as redeemed,
/// an unreversed debit without it counts as pending, and a debit with a
/// matching `WithdrawalReversal` counts toward neither.
pub fn project(transactions: &[CreditTransaction], settled_payouts: &HashSet<String>) -> Balance {
    let reversed: HashSet<&str> = transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::WithdrawalReversal)
        .filter_map(|tx| tx.related_entity.as_deref())
        .collect();

    let mut balance = Balance::default();

    for tx in transactions {
        if tx.is_earning() {
            balance.lifetime += tx.amount;
        } else if tx.kind == TransactionKind::WithdrawalDebit {
            let payout_id = tx.related_entity.as_deref().unwrap_or_default();
            if reversed.contains(payout_id) {
                continue;
            }
            if settled_payouts.contains(payout_id) {
                balance.redeemed += tx.amount.abs();
            } else {
                balance.pending += tx.amount.abs();
            }
        }
    }

    balance.available = balance.lifetime - balance.redeemed - balance.pending;
    balance
}

/// Replay the ledger prefix-by-prefix and confirm the balance identity
/// holds at every point in history. Verification helper for tests and
/// audits; transactions must already be in `created_at` order.
pub fn replay_holds(
    transactions: &[CreditTransaction],
    settled_payouts: &HashSet<String>,
) -> bool {
    (0..=transactions.len()).all(|n| {
        let b = project(&transactions[..n], settled_payouts);
        b.available == b.lifetime - b.redeemed - b.pending && b.available >= 0
    })
}
