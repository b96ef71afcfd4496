//! Credit Transaction Types
//!
//! The ledger's unit of record. Transactions are immutable once appended;
//! corrections are new offsetting entries, never edits. 100 credits = $1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every credit-affecting event kind the ledger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    ReportReward,
    ReferralBonus,
    TierMonthlyBonus,
    MarketplaceShare,
    WithdrawalDebit,
    WithdrawalReversal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::ReportReward => "report_reward",
            TransactionKind::ReferralBonus => "referral_bonus",
            TransactionKind::TierMonthlyBonus => "tier_monthly_bonus",
            TransactionKind::MarketplaceShare => "marketplace_share",
            TransactionKind::WithdrawalDebit => "withdrawal_debit",
            TransactionKind::WithdrawalReversal => "withdrawal_reversal",
        }
    }
}

/// An immutable ledger entry. `amount` is signed: earnings positive,
/// withdrawal debits negative, reversals positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub user_id: String,
    pub amount: i64,
    pub kind: TransactionKind,
    /// Report/referral/payout id this entry settles; the idempotency
    /// guard keys on (related_entity, kind).
    pub related_entity: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    pub fn new(
        user_id: impl Into<String>,
        amount: i64,
        kind: TransactionKind,
        related_entity: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            amount,
            kind,
            related_entity,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// True for entries that count toward lifetime earnings. Reversals are
    /// positive but restore a debit rather than earn.
    pub fn is_earning(&self) -> bool {
        self.amount > 0 && self.kind != TransactionKind::WithdrawalReversal
    }
}

/// Deterministic idempotency key for a (related_entity, kind) pair.
/// Identical inputs always derive the identical key, so a retried
/// submission collides in the store instead of double-crediting.
pub fn idempotency_key(related_entity: &str, kind: TransactionKind) -> u128 {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(related_entity.as_bytes());
    hasher.update(b":");
    hasher.update(kind.as_str().as_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);
    u128::from_le_bytes(bytes)
}
