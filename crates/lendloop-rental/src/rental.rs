//! The rental record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lendloop_types::{
    DamageSeverity, DateRange, ItemId, LendError, Party, PenaltyId, RentalId, Result, Tokens,
    UserId,
};

use crate::{ConfirmationSet, RentalAction, RentalStatus};

/// One entry of a rental's status history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Option<RentalStatus>,
    pub to: RentalStatus,
    /// Who caused it
    pub by: UserId,
    pub at: DateTime<Utc>,
}

/// A borrow transaction between an item's owner and a borrower
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    pub id: RentalId,
    pub item_id: ItemId,
    pub item_title: String,
    pub owner: UserId,
    pub borrower: UserId,
    pub range: DateRange,
    pub days: u64,
    /// Price per day captured at request time
    pub daily_price: Tokens,
    /// Declared item value captured at request time
    pub item_value: u64,
    pub total_tokens: Tokens,
    pub status: RentalStatus,
    pub delivery: ConfirmationSet,
    pub return_confirmation: ConfirmationSet,
    /// Reported by the owner when confirming the return
    pub damage: DamageSeverity,
    pub returned_at: Option<DateTime<Utc>>,
    /// Penalties assessed at return
    pub penalties: Vec<PenaltyId>,
    /// Bumped on every mutation
    pub version: u64,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rental {
    /// Which side `user` is on
    pub fn party_of(&self, user: &UserId) -> Result<Party> {
        if user == &self.owner {
            Ok(Party::Owner)
        } else if user == &self.borrower {
            Ok(Party::Borrower)
        } else {
            Err(LendError::not_authorized(format!(
                "{} is not a party to {}",
                user, self.id
            )))
        }
    }

    pub fn is_party(&self, user: &UserId) -> bool {
        user == &self.owner || user == &self.borrower
    }

    pub fn require_owner(&self, user: &UserId) -> Result<()> {
        if user != &self.owner {
            return Err(LendError::not_authorized(format!(
                "only the owner may act on {}",
                self.id
            )));
        }
        Ok(())
    }

    pub fn counterparty_of(&self, user: &UserId) -> Option<UserId> {
        if user == &self.owner {
            Some(self.borrower)
        } else if user == &self.borrower {
            Some(self.owner)
        } else {
            None
        }
    }

    /// The status `action` leads to, or `InvalidTransition`
    pub fn next_status(&self, action: RentalAction) -> Result<RentalStatus> {
        self.status
            .next(action)
            .ok_or_else(|| LendError::InvalidTransition {
                entity: self.id.to_string(),
                from: self.status.to_string(),
                action: action.to_string(),
            })
    }

    /// Move to `to`, recording history and bumping the version
    pub(crate) fn advance(&mut self, to: RentalStatus, by: UserId, at: DateTime<Utc>) {
        self.history.push(StatusChange {
            from: Some(self.status),
            to,
            by,
            at,
        });
        self.status = to;
        self.touch(at);
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = at;
    }

    /// Statuses this rental has passed through, oldest first
    pub fn status_trail(&self) -> Vec<RentalStatus> {
        self.history.iter().map(|c| c.to).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rental() -> Rental {
        let now = Utc::now();
        let owner = UserId::new();
        Rental {
            id: RentalId::new(),
            item_id: ItemId::new(),
            item_title: "Tent".to_string(),
            owner,
            borrower: UserId::new(),
            range: DateRange::starting(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(), 4).unwrap(),
            days: 4,
            daily_price: Tokens::new(3),
            item_value: 8_000,
            total_tokens: Tokens::new(12),
            status: RentalStatus::Pending,
            delivery: ConfirmationSet::default(),
            return_confirmation: ConfirmationSet::default(),
            damage: DamageSeverity::None,
            returned_at: None,
            penalties: Vec::new(),
            version: 0,
            history: vec![StatusChange {
                from: None,
                to: RentalStatus::Pending,
                by: owner,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parties() {
        let r = rental();
        assert_eq!(r.party_of(&r.owner).unwrap(), Party::Owner);
        assert_eq!(r.party_of(&r.borrower).unwrap(), Party::Borrower);
        assert!(matches!(
            r.party_of(&UserId::new()),
            Err(LendError::NotAuthorized { .. })
        ));
        assert_eq!(r.counterparty_of(&r.owner), Some(r.borrower));
    }

    #[test]
    fn test_advance_records_history() {
        let mut r = rental();
        let owner = r.owner;
        let next = r.next_status(RentalAction::Approve).unwrap();
        r.advance(next, owner, Utc::now());
        assert_eq!(r.version, 1);
        assert_eq!(r.status_trail(), vec![RentalStatus::Pending, RentalStatus::Approved]);
        assert!(matches!(
            r.next_status(RentalAction::Reject),
            Err(LendError::InvalidTransition { .. })
        ));
    }
}
