//! Reviews and the rental facts they hang off

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lendloop_types::{LendError, RentalId, Result, ReviewId, UserId};

/// What the reputation engine needs to know about a rental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalView {
    pub rental_id: RentalId,
    pub owner: UserId,
    pub borrower: UserId,
    pub completed: bool,
}

impl RentalView {
    pub fn is_party(&self, user: &UserId) -> bool {
        user == &self.owner || user == &self.borrower
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

    /// `actor` must be a party and `other` the opposite one
    pub(crate) fn check_pair(&self, actor: &UserId, other: &UserId, field: &str) -> Result<()> {
        let expected = self.counterparty_of(actor).ok_or_else(|| {
            LendError::not_authorized(format!("{} is not a party to {}", actor, self.rental_id))
        })?;
        if &expected != other {
            return Err(LendError::validation(
                field,
                format!("must be the other party of {}", self.rental_id),
            ));
        }
        Ok(())
    }
}

/// A star rating left by one party of a completed rental for the other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub rental_id: RentalId,
    pub rater: UserId,
    pub rated: UserId,
    pub stars: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Which parties have reviewed a rental
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStatus {
    pub owner_submitted: bool,
    pub borrower_submitted: bool,
}

impl FeedbackStatus {
    pub fn is_complete(&self) -> bool {
        self.owner_submitted && self.borrower_submitted
    }
}

pub(crate) fn check_stars(stars: u8) -> Result<()> {
    if !(1..=5).contains(&stars) {
        return Err(LendError::validation("stars", "must be between 1 and 5"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_pair() {
        let view = RentalView {
            rental_id: RentalId::new(),
            owner: UserId::new(),
            borrower: UserId::new(),
            completed: true,
        };
        assert!(view.check_pair(&view.owner, &view.borrower, "rated").is_ok());
        assert!(matches!(
            view.check_pair(&view.owner, &view.owner, "rated"),
            Err(LendError::ValidationError { .. })
        ));
        assert!(matches!(
            view.check_pair(&UserId::new(), &view.owner, "rated"),
            Err(LendError::NotAuthorized { .. })
        ));
    }

    #[test]
    fn test_star_bounds() {
        assert!(check_stars(0).is_err());
        assert!(check_stars(1).is_ok());
        assert!(check_stars(5).is_ok());
        assert!(check_stars(6).is_err());
    }
}
