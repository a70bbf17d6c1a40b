//! The penalty book: recording and settling penalties
//!
//! Penalties are never deducted automatically at return time. They sit
//! unpaid until [`PenaltyBook::process_pending`] collects what the liable
//! member can afford, oldest first.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use lendloop_ledger::{EntryReason, Ledger};
use lendloop_types::{Clock, LendError, PenaltyId, RentalId, Result, ReturnFacts, Tokens, UserId};

use crate::{assess, Penalty};

/// How a settlement run ended for one member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Nothing was owed
    NothingPending,
    /// Everything owed has been collected
    Settled,
    /// Some was collected, some is still owed
    Partial,
    /// Something is owed but the balance is empty
    NoFunds,
}

/// One transfer made while settling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyPayment {
    pub penalty_id: PenaltyId,
    pub rental_id: RentalId,
    pub beneficiary: UserId,
    pub amount: Tokens,
    /// This payment cleared the penalty
    pub cleared: bool,
}

/// Result of settling one member's penalties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub user: UserId,
    pub outcome: SettlementOutcome,
    pub collected: Tokens,
    pub still_owed: Tokens,
    pub payments: Vec<PenaltyPayment>,
}

/// All penalties, oldest first
#[derive(Clone)]
pub struct PenaltyBook {
    penalties: Arc<RwLock<Vec<Penalty>>>,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
}

impl PenaltyBook {
    pub fn new(ledger: Ledger, clock: Arc<dyn Clock>) -> Self {
        Self {
            penalties: Arc::new(RwLock::new(Vec::new())),
            ledger,
            clock,
        }
    }

    /// Assess a completed return and record the resulting penalties unpaid
    pub async fn record_return(&self, facts: &ReturnFacts) -> Result<Vec<Penalty>> {
        let charges = assess(facts);
        if charges.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let created: Vec<Penalty> = charges
            .into_iter()
            .map(|(reason, amount)| Penalty {
                id: PenaltyId::new(),
                rental_id: facts.rental_id,
                item_id: facts.item_id,
                liable: facts.borrower,
                beneficiary: facts.owner,
                amount,
                paid_amount: Tokens::ZERO,
                reason,
                paid: false,
                created_at: now,
                paid_at: None,
            })
            .collect();

        self.penalties.write().await.extend(created.iter().cloned());
        for penalty in &created {
            info!(
                penalty_id = %penalty.id,
                rental_id = %penalty.rental_id,
                liable = %penalty.liable,
                amount = %penalty.amount,
                reason = %penalty.reason,
                "penalty recorded"
            );
        }
        Ok(created)
    }

    /// Collect what `user` can pay toward their unpaid penalties
    ///
    /// Walks unpaid penalties oldest first, moving `min(balance,
    /// outstanding)` to each beneficiary. The balance is read by the ledger
    /// as it pays, so spending that races a settlement only shrinks it.
    /// Stops at the first penalty it can only partly cover.
    pub async fn process_pending(&self, user: &UserId) -> Result<SettlementReport> {
        let mut penalties = self.penalties.write().await;
        let unpaid: Vec<usize> = penalties
            .iter()
            .enumerate()
            .filter(|(_, p)| &p.liable == user && !p.paid)
            .map(|(i, _)| i)
            .collect();

        if unpaid.is_empty() {
            return Ok(SettlementReport {
                user: *user,
                outcome: SettlementOutcome::NothingPending,
                collected: Tokens::ZERO,
                still_owed: Tokens::ZERO,
                payments: Vec::new(),
            });
        }

        let mut payments = Vec::new();
        let mut collected = Tokens::ZERO;

        for index in unpaid.iter().copied() {
            let penalty = &mut penalties[index];
            let owed = penalty.outstanding();
            let receipt = self
                .ledger
                .transfer_up_to(
                    user,
                    &penalty.beneficiary,
                    owed,
                    EntryReason::PenaltyPayment {
                        penalty_id: penalty.id,
                        rental_id: penalty.rental_id,
                    },
                )
                .await?;
            let Some(receipt) = receipt else {
                break;
            };
            let pay = receipt.amount;

            penalty.paid_amount = penalty.paid_amount + pay;
            let cleared = pay == owed;
            if cleared {
                penalty.paid = true;
                penalty.paid_at = Some(self.clock.now());
            }
            collected = collected + pay;
            payments.push(PenaltyPayment {
                penalty_id: penalty.id,
                rental_id: penalty.rental_id,
                beneficiary: penalty.beneficiary,
                amount: pay,
                cleared,
            });
            debug!(penalty_id = %penalty.id, amount = %pay, cleared, "penalty payment");

            if !cleared {
                break;
            }
        }

        let still_owed: Tokens = unpaid.iter().map(|&i| penalties[i].outstanding()).sum();
        let outcome = if collected.is_zero() {
            SettlementOutcome::NoFunds
        } else if still_owed.is_zero() {
            SettlementOutcome::Settled
        } else {
            SettlementOutcome::Partial
        };

        info!(%user, %collected, %still_owed, ?outcome, "penalties processed");
        Ok(SettlementReport {
            user: *user,
            outcome,
            collected,
            still_owed,
            payments,
        })
    }

    /// Settle every member who owes something
    ///
    /// A failure for one member is logged and does not stop the others.
    pub async fn sweep(&self) -> Vec<SettlementReport> {
        let liable: BTreeSet<UserId> = {
            let penalties = self.penalties.read().await;
            penalties.iter().filter(|p| !p.paid).map(|p| p.liable).collect()
        };

        let mut reports = Vec::with_capacity(liable.len());
        for user in liable {
            match self.process_pending(&user).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(%user, error = %e, "penalty settlement failed"),
            }
        }
        reports
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get(&self, id: &PenaltyId) -> Result<Penalty> {
        self.penalties
            .read()
            .await
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| LendError::not_found("penalty", id))
    }

    /// Penalties `user` is liable for, oldest first
    pub async fn of_user(&self, user: &UserId) -> Vec<Penalty> {
        self.filtered(|p| &p.liable == user).await
    }

    pub async fn of_rental(&self, rental_id: &RentalId) -> Vec<Penalty> {
        self.filtered(|p| &p.rental_id == rental_id).await
    }

    /// Total still owed by `user`
    pub async fn outstanding(&self, user: &UserId) -> Tokens {
        self.penalties
            .read()
            .await
            .iter()
            .filter(|p| &p.liable == user)
            .map(|p| p.outstanding())
            .sum()
    }

    async fn filtered(&self, keep: impl Fn(&Penalty) -> bool) -> Vec<Penalty> {
        self.penalties
            .read()
            .await
            .iter()
            .filter(|p| keep(p))
            .cloned()
            .collect()
    }
}
