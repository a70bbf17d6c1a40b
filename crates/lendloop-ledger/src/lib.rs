//! LendLoop Ledger - Token balances for lending members
//!
//! The ledger is:
//! - Account-keyed by UserId
//! - The only writer of balances (no other component mutates tokens)
//! - Append-only (every mutation produces an immutable entry)
//! - Correlated (entries reference the rental or penalty that caused them)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Every entry has a reason
//! 3. A transfer is all-or-nothing; no partial effect is ever observable
//! 4. Check-and-mutate happens under a single lock acquisition

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lendloop_types::{EntryId, LendError, PenaltyId, RentalId, Result, Tokens, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Increase of an account balance
    Credit,
    /// Decrease of an account balance
    Debit,
}

/// Why tokens moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryReason {
    /// Starting balance granted at registration
    RegistrationGrant,
    /// Rental fee moved from borrower to owner at approval
    RentalPayment { rental_id: RentalId },
    /// Rental fee returned to the borrower on cancellation
    RentalRefund { rental_id: RentalId },
    /// Penalty collected from the liable member
    PenaltyPayment {
        penalty_id: PenaltyId,
        rental_id: RentalId,
    },
}

impl EntryReason {
    /// Correlation key linking every entry produced by the same cause
    pub fn correlation_id(&self, account: &UserId) -> String {
        match self {
            Self::RegistrationGrant => format!("grant:{}", account),
            Self::RentalPayment { rental_id } => format!("payment:{}", rental_id),
            Self::RentalRefund { rental_id } => format!("refund:{}", rental_id),
            Self::PenaltyPayment { penalty_id, .. } => format!("penalty:{}", penalty_id),
        }
    }

    /// The rental this movement belongs to, if any
    pub fn rental_id(&self) -> Option<RentalId> {
        match self {
            Self::RegistrationGrant => None,
            Self::RentalPayment { rental_id }
            | Self::RentalRefund { rental_id }
            | Self::PenaltyPayment { rental_id, .. } => Some(*rental_id),
        }
    }
}

/// A single ledger entry (one side of a movement)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub account: UserId,
    pub kind: EntryKind,
    pub amount: Tokens,
    pub balance_after: Tokens,
    pub reason: EntryReason,
    pub correlation_id: String,
    pub created_at: DateTime<Utc>,
}

/// Both legs of a completed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub debit_entry: EntryId,
    pub credit_entry: EntryId,
    pub amount: Tokens,
    pub from_balance: Tokens,
    pub to_balance: Tokens,
}

/// Account state in the ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: Tokens,
    pub entry_count: u64,
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<UserId, AccountState>,
    entries: Vec<LedgerEntry>,
    /// correlation_id -> indices into `entries`
    correlations: HashMap<String, Vec<usize>>,
}

impl LedgerState {
    fn account_mut(&mut self, account: &UserId) -> Result<&mut AccountState> {
        self.accounts
            .get_mut(account)
            .ok_or_else(|| LendError::not_found("account", account))
    }

    fn push_entry(
        &mut self,
        account: UserId,
        kind: EntryKind,
        amount: Tokens,
        balance_after: Tokens,
        reason: EntryReason,
    ) -> EntryId {
        let correlation_id = reason.correlation_id(&account);
        let entry = LedgerEntry {
            entry_id: EntryId::new(),
            account,
            kind,
            amount,
            balance_after,
            reason,
            correlation_id: correlation_id.clone(),
            created_at: Utc::now(),
        };
        let entry_id = entry.entry_id;
        self.correlations
            .entry(correlation_id)
            .or_default()
            .push(self.entries.len());
        self.entries.push(entry);
        entry_id
    }

    fn apply_credit(
        &mut self,
        account: &UserId,
        amount: Tokens,
        reason: EntryReason,
    ) -> Result<(Tokens, EntryId)> {
        let state = self.account_mut(account)?;
        let new_balance = state
            .balance
            .checked_add(amount)
            .ok_or_else(|| LendError::validation("amount", "balance overflow"))?;
        state.balance = new_balance;
        state.entry_count += 1;

        let entry_id = self.push_entry(*account, EntryKind::Credit, amount, new_balance, reason);
        Ok((new_balance, entry_id))
    }

    fn apply_debit(
        &mut self,
        account: &UserId,
        amount: Tokens,
        reason: EntryReason,
    ) -> Result<(Tokens, EntryId)> {
        let state = self.account_mut(account)?;
        let new_balance =
            state
                .balance
                .checked_sub(amount)
                .ok_or_else(|| LendError::InsufficientFunds {
                    user: account.to_string(),
                    requested: amount.value(),
                    available: state.balance.value(),
                })?;
        state.balance = new_balance;
        state.entry_count += 1;

        let entry_id = self.push_entry(*account, EntryKind::Debit, amount, new_balance, reason);
        Ok((new_balance, entry_id))
    }

    /// Apply both legs, checking every precondition first
    fn apply_transfer(
        &mut self,
        from: &UserId,
        to: &UserId,
        amount: Tokens,
        reason: EntryReason,
    ) -> Result<TransferReceipt> {
        let from_balance = self
            .accounts
            .get(from)
            .map(|a| a.balance)
            .ok_or_else(|| LendError::not_found("account", from))?;
        let to_balance = self
            .accounts
            .get(to)
            .map(|a| a.balance)
            .ok_or_else(|| LendError::not_found("account", to))?;
        if from_balance < amount {
            return Err(LendError::InsufficientFunds {
                user: from.to_string(),
                requested: amount.value(),
                available: from_balance.value(),
            });
        }
        if to_balance.checked_add(amount).is_none() {
            return Err(LendError::validation("amount", "balance overflow"));
        }

        let (from_balance, debit_entry) = self.apply_debit(from, amount, reason.clone())?;
        let (to_balance, credit_entry) = self.apply_credit(to, amount, reason)?;
        Ok(TransferReceipt {
            debit_entry,
            credit_entry,
            amount,
            from_balance,
            to_balance,
        })
    }
}

fn require_positive(amount: Tokens) -> Result<()> {
    if amount.is_zero() {
        return Err(LendError::validation("amount", "must be greater than zero"));
    }
    Ok(())
}

/// The LendLoop Ledger
///
/// Thread-safe; clones share the same underlying state.
#[derive(Clone, Default)]
pub struct Ledger {
    state: Arc<RwLock<LedgerState>>,
}

impl Ledger {
    /// Create a new in-memory ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an account, optionally seeding it with a registration grant
    pub async fn open_account(&self, account: &UserId, grant: Tokens) -> Result<Tokens> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(account) {
            return Err(LendError::validation(
                "account",
                format!("{} already has an account", account),
            ));
        }
        state.accounts.insert(
            *account,
            AccountState {
                opened_at: Some(Utc::now()),
                ..Default::default()
            },
        );

        if grant.is_zero() {
            return Ok(Tokens::ZERO);
        }
        let (balance, _) = state.apply_credit(account, grant, EntryReason::RegistrationGrant)?;
        debug!(%account, %balance, "account opened");
        Ok(balance)
    }

    /// Get the balance of an account
    pub async fn balance(&self, account: &UserId) -> Result<Tokens> {
        let state = self.state.read().await;
        state
            .accounts
            .get(account)
            .map(|a| a.balance)
            .ok_or_else(|| LendError::not_found("account", account))
    }

    /// Credit an account (increase balance)
    ///
    /// Returns the new balance and the entry ID.
    pub async fn credit(
        &self,
        account: &UserId,
        amount: Tokens,
        reason: EntryReason,
    ) -> Result<(Tokens, EntryId)> {
        require_positive(amount)?;
        let mut state = self.state.write().await;
        let result = state.apply_credit(account, amount, reason)?;
        debug!(%account, %amount, balance = %result.0, "credit");
        Ok(result)
    }

    /// Debit an account (decrease balance)
    ///
    /// Fails with `InsufficientFunds` if the balance would go negative.
    pub async fn debit(
        &self,
        account: &UserId,
        amount: Tokens,
        reason: EntryReason,
    ) -> Result<(Tokens, EntryId)> {
        require_positive(amount)?;
        let mut state = self.state.write().await;
        let result = state.apply_debit(account, amount, reason)?;
        debug!(%account, %amount, balance = %result.0, "debit");
        Ok(result)
    }

    /// Move tokens between two accounts
    ///
    /// Both legs are applied under the same write lock. Every precondition is
    /// checked before either leg is written, so a failure leaves both
    /// accounts untouched.
    pub async fn transfer(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Tokens,
        reason: EntryReason,
    ) -> Result<TransferReceipt> {
        require_positive(amount)?;
        if from == to {
            return Err(LendError::validation("to", "cannot transfer to the same account"));
        }

        let mut state = self.state.write().await;
        let receipt = state.apply_transfer(from, to, amount, reason)?;
        debug!(%from, %to, %amount, "transfer");
        Ok(receipt)
    }

    /// Move as much of `cap` as `from` can currently afford
    ///
    /// The amount is decided under the same write lock that applies it, so a
    /// concurrent debit can shrink the payment but never fail it. Returns
    /// `None` when `from` has nothing to give.
    pub async fn transfer_up_to(
        &self,
        from: &UserId,
        to: &UserId,
        cap: Tokens,
        reason: EntryReason,
    ) -> Result<Option<TransferReceipt>> {
        require_positive(cap)?;
        if from == to {
            return Err(LendError::validation("to", "cannot transfer to the same account"));
        }

        let mut state = self.state.write().await;
        let available = state
            .accounts
            .get(from)
            .map(|a| a.balance)
            .ok_or_else(|| LendError::not_found("account", from))?;
        let amount = available.min(cap);
        if amount.is_zero() {
            return Ok(None);
        }

        let receipt = state.apply_transfer(from, to, amount, reason)?;
        debug!(%from, %to, %amount, %cap, "capped transfer");
        Ok(Some(receipt))
    }

    /// Get all entries for an account (oldest first)
    pub async fn account_entries(&self, account: &UserId) -> Vec<LedgerEntry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| &e.account == account)
            .cloned()
            .collect()
    }

    /// Get entries sharing a correlation id
    pub async fn correlated_entries(&self, correlation_id: &str) -> Vec<LedgerEntry> {
        let state = self.state.read().await;
        match state.correlations.get(correlation_id) {
            Some(indices) => indices.iter().map(|&i| state.entries[i].clone()).collect(),
            None => vec![],
        }
    }

    /// Get every entry caused by a rental (payment, refund, penalties)
    pub async fn rental_entries(&self, rental_id: &RentalId) -> Vec<LedgerEntry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| e.reason.rental_id().as_ref() == Some(rental_id))
            .cloned()
            .collect()
    }

    /// Get the total number of entries
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Sum of all balances
    pub async fn total_supply(&self) -> Tokens {
        let state = self.state.read().await;
        state.accounts.values().map(|a| a.balance).sum()
    }
}
