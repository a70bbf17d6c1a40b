//! Penalty records and how they are assessed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use lendloop_types::{DamageSeverity, ItemId, PenaltyId, RentalId, ReturnFacts, Tokens, UserId};

/// Why a penalty was charged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PenaltyReason {
    LateReturn { days_late: u64 },
    Damage { severity: DamageSeverity },
}

impl fmt::Display for PenaltyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LateReturn { days_late } => write!(f, "late return ({} days)", days_late),
            Self::Damage { severity } => write!(f, "damage:{}", severity),
        }
    }
}

/// A charge owed by a borrower to an item owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Penalty {
    pub id: PenaltyId,
    pub rental_id: RentalId,
    pub item_id: ItemId,
    /// The borrower
    pub liable: UserId,
    /// The owner, who receives what is collected
    pub beneficiary: UserId,
    pub amount: Tokens,
    pub paid_amount: Tokens,
    pub reason: PenaltyReason,
    /// Set only once the full amount is collected
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Penalty {
    pub fn outstanding(&self) -> Tokens {
        self.amount.saturating_sub(self.paid_amount)
    }
}

/// Share of the item's value charged for each damage level
pub fn damage_charge(value: u64, severity: DamageSeverity) -> u64 {
    match severity {
        DamageSeverity::None => 0,
        DamageSeverity::Light => value / 4,
        DamageSeverity::Medium => value / 3,
        DamageSeverity::High => value / 2,
        DamageSeverity::Severe => value,
    }
}

/// Charges owed for a return: lateness first, then damage
///
/// Zero-token charges are dropped (a light scratch on a 3-unit item costs
/// nothing).
pub fn assess(facts: &ReturnFacts) -> Vec<(PenaltyReason, Tokens)> {
    let mut charges = Vec::new();

    let days_late = facts.days_late();
    if days_late > 0 {
        let amount = facts.daily_price.value().saturating_mul(days_late);
        charges.push((PenaltyReason::LateReturn { days_late }, Tokens::new(amount)));
    }

    if facts.damage.is_damaged() {
        let amount = damage_charge(facts.item_value, facts.damage);
        charges.push((
            PenaltyReason::Damage {
                severity: facts.damage,
            },
            Tokens::new(amount),
        ));
    }

    charges.retain(|(_, amount)| !amount.is_zero());
    charges
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn facts(days_late: i64, damage: DamageSeverity, value: u64) -> ReturnFacts {
        let end = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        ReturnFacts {
            rental_id: RentalId::new(),
            item_id: ItemId::new(),
            borrower: UserId::new(),
            owner: UserId::new(),
            daily_price: Tokens::new(3),
            item_value: value,
            agreed_end: end,
            returned_on: end + chrono::Duration::days(days_late),
            damage,
        }
    }

    #[test]
    fn test_damage_multipliers() {
        assert_eq!(damage_charge(8_000, DamageSeverity::None), 0);
        assert_eq!(damage_charge(8_000, DamageSeverity::Light), 2_000);
        assert_eq!(damage_charge(8_000, DamageSeverity::Medium), 2_666);
        assert_eq!(damage_charge(8_000, DamageSeverity::High), 4_000);
        assert_eq!(damage_charge(8_000, DamageSeverity::Severe), 8_000);
    }

    #[test]
    fn test_on_time_undamaged_costs_nothing() {
        assert!(assess(&facts(0, DamageSeverity::None, 8_000)).is_empty());
        assert!(assess(&facts(-2, DamageSeverity::None, 8_000)).is_empty());
    }

    #[test]
    fn test_three_days_late() {
        let charges = assess(&facts(3, DamageSeverity::None, 8_000));
        assert_eq!(
            charges,
            vec![(PenaltyReason::LateReturn { days_late: 3 }, Tokens::new(9))]
        );
    }

    #[test]
    fn test_late_and_damaged() {
        let charges = assess(&facts(1, DamageSeverity::Severe, 8_000));
        assert_eq!(charges.len(), 2);
        assert_eq!(charges[1].1, Tokens::new(8_000));
    }

    #[test]
    fn test_zero_value_damage_dropped() {
        assert!(assess(&facts(0, DamageSeverity::Light, 3)).is_empty());
    }

    #[test]
    fn test_reason_wire_format() {
        let json = serde_json::to_value(PenaltyReason::LateReturn { days_late: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "late_return", "days_late": 3}));

        let damage: PenaltyReason =
            serde_json::from_str(r#"{"kind": "damage", "severity": "high"}"#).unwrap();
        assert_eq!(damage, PenaltyReason::Damage { severity: DamageSeverity::High });
    }
}
