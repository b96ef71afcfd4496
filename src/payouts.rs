//! Payout Authorization
//!
//! Validates withdrawal requests against available balance and the
//! tier-specific minimum, then emits a pending debit for the external
//! payment collaborator to execute. Debits are never edited afterwards:
//! a failed payment is corrected by a reversal entry, a completed one is
//! marked settled in the request lifecycle only.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::ledger::{balance, CreditTransaction, LedgerStore, TransactionKind};
use crate::scoring::tiers::TierRequirement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    Paypal,
    GiftCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Debit appended, awaiting external execution.
    Pending,
    /// External payment executed; debit now counts as redeemed.
    Settled,
    /// External payment failed; reversal entry restored the balance.
    Reversed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub method: PayoutMethod,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PayoutAuthorizer {
    ledger: LedgerStore,
    requests: Arc<RwLock<HashMap<String, PayoutRequest>>>,
}

impl PayoutAuthorizer {
    pub fn new(ledger: LedgerStore) -> Self {
        Self {
            ledger,
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Payout ids the external collaborator has executed; input to the
    /// balance fold's pending/redeemed split.
    pub async fn settled_payouts(&self) -> HashSet<String> {
        let requests = self.requests.read().await;
        requests
            .values()
            .filter(|r| r.status == PayoutStatus::Settled)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Authorize a withdrawal. Rejects below the tier minimum or beyond
    /// the available balance without appending anything; otherwise appends
    /// one pending `WithdrawalDebit` and returns the request for the
    /// payment collaborator. Callers hold the per-user lock so the
    /// balance check and the append are one atomic step.
    pub async fn authorize(
        &self,
        user_id: &str,
        amount: i64,
        method: PayoutMethod,
        tier: &TierRequirement,
    ) -> EngineResult<PayoutRequest> {
        if amount <= 0 {
            return Err(EngineError::InvariantViolation(format!(
                "payout amount must be positive, got {}",
                amount
            )));
        }
        if amount < tier.min_payout_credits {
            return Err(EngineError::BelowMinimum {
                minimum: tier.min_payout_credits,
                tier: tier.tier.as_str().to_string(),
            });
        }

        let transactions = self.ledger.query(user_id, None, None, None).await;
        let settled = self.settled_payouts().await;
        let current = balance::project(&transactions, &settled);
        if amount > current.available {
            return Err(EngineError::InsufficientBalance {
                requested: amount,
                available: current.available,
            });
        }

        let request = PayoutRequest {
            id: format!("payout_{}", Uuid::new_v4()),
            user_id: user_id.to_string(),
            amount,
            method,
            status: PayoutStatus::Pending,
            created_at: Utc::now(),
        };

        self.ledger
            .append(CreditTransaction::new(
                user_id,
                -amount,
                TransactionKind::WithdrawalDebit,
                Some(request.id.clone()),
            ))
            .await?;

        let mut requests = self.requests.write().await;
        requests.insert(request.id.clone(), request.clone());

        info!(
            user_id = %user_id,
            payout_id = %request.id,
            amount = amount,
            method = ?method,
            "Payout authorized, debit pending"
        );

        Ok(request)
    }

    /// Correction path for a failed external payment: one reversal entry
    /// restores the balance. The ledger guard makes a second reversal for
    /// the same payout a `DuplicateEntry`.
    pub async fn reverse(&self, payout_id: &str) -> EngineResult<PayoutRequest> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {}", payout_id)))?;

        if request.status == PayoutStatus::Settled {
            warn!(payout_id = %payout_id, "Refusing to reverse a settled payout");
            return Err(EngineError::InvariantViolation(format!(
                "payout {} already settled",
                payout_id
            )));
        }

        self.ledger
            .append(CreditTransaction::new(
                request.user_id.clone(),
                request.amount,
                TransactionKind::WithdrawalReversal,
                Some(request.id.clone()),
            ))
            .await?;

        request.status = PayoutStatus::Reversed;
        info!(
            payout_id = %payout_id,
            user_id = %request.user_id,
            amount = request.amount,
            "Payout reversed"
        );

        Ok(request.clone())
    }

    /// Mark a payout executed. Moves the debit from pending to redeemed in
    /// the projection; `available` is unchanged. Idempotent.
    pub async fn settle(&self, payout_id: &str) -> EngineResult<PayoutRequest> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(payout_id)
            .ok_or_else(|| EngineError::NotFound(format!("payout {}", payout_id)))?;

        match request.status {
            PayoutStatus::Reversed => Err(EngineError::InvariantViolation(format!(
                "payout {} already reversed",
                payout_id
            ))),
            _ => {
                request.status = PayoutStatus::Settled;
                info!(payout_id = %payout_id, "Payout settled");
                Ok(request.clone())
            }
        }
    }

    pub async fn get(&self, payout_id: &str) -> Option<PayoutRequest> {
        let requests = self.requests.read().await;
        requests.get(payout_id).cloned()
    }
}
