//! What the rental layer knows when an item comes back

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DamageSeverity, ItemId, RentalId, Tokens, UserId};

/// Facts captured when both parties have confirmed a return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnFacts {
    pub rental_id: RentalId,
    pub item_id: ItemId,
    /// Liable for any penalty
    pub borrower: UserId,
    /// Receives collected penalties
    pub owner: UserId,
    /// Price per day agreed at request time
    pub daily_price: Tokens,
    /// Declared item value agreed at request time
    pub item_value: u64,
    pub agreed_end: NaiveDate,
    pub returned_on: NaiveDate,
    pub damage: DamageSeverity,
}

impl ReturnFacts {
    /// Whole calendar days past the agreed end date
    pub fn days_late(&self) -> u64 {
        if self.returned_on > self.agreed_end {
            (self.returned_on - self.agreed_end).num_days() as u64
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(end: (i32, u32, u32), returned: (i32, u32, u32)) -> ReturnFacts {
        ReturnFacts {
            rental_id: RentalId::new(),
            item_id: ItemId::new(),
            borrower: UserId::new(),
            owner: UserId::new(),
            daily_price: Tokens::new(3),
            item_value: 8_000,
            agreed_end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            returned_on: NaiveDate::from_ymd_opt(returned.0, returned.1, returned.2).unwrap(),
            damage: DamageSeverity::None,
        }
    }

    #[test]
    fn test_days_late() {
        assert_eq!(facts((2025, 3, 10), (2025, 3, 13)).days_late(), 3);
        assert_eq!(facts((2025, 3, 10), (2025, 3, 10)).days_late(), 0);
        assert_eq!(facts((2025, 3, 10), (2025, 3, 2)).days_late(), 0);
    }
}
