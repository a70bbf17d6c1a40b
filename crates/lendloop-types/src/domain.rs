//! Shared domain enums

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::LendError;

/// Which side of a rental a participant is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Owner,
    Borrower,
}

impl Party {
    pub fn counterparty(&self) -> Party {
        match self {
            Party::Owner => Party::Borrower,
            Party::Borrower => Party::Owner,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Owner => write!(f, "owner"),
            Party::Borrower => write!(f, "borrower"),
        }
    }
}

/// Damage reported by the owner when an item comes back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSeverity {
    #[default]
    None,
    Light,
    Medium,
    High,
    Severe,
}

impl DamageSeverity {
    pub fn is_damaged(&self) -> bool {
        !matches!(self, DamageSeverity::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DamageSeverity::None => "none",
            DamageSeverity::Light => "light",
            DamageSeverity::Medium => "medium",
            DamageSeverity::High => "high",
            DamageSeverity::Severe => "severe",
        }
    }
}

impl fmt::Display for DamageSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DamageSeverity {
    type Err = LendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "light" => Ok(Self::Light),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "severe" => Ok(Self::Severe),
            other => Err(LendError::validation(
                "damage_severity",
                format!("unknown severity '{}'", other),
            )),
        }
    }
}

/// Kind of grievance filed against a counterparty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintKind {
    Delivery,
    Damage,
    Behavior,
    Other,
}

impl fmt::Display for ComplaintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Delivery => "delivery",
            Self::Damage => "damage",
            Self::Behavior => "behavior",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl FromStr for ComplaintKind {
    type Err = LendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delivery" => Ok(Self::Delivery),
            "damage" => Ok(Self::Damage),
            "behavior" => Ok(Self::Behavior),
            "other" => Ok(Self::Other),
            other => Err(LendError::validation(
                "complaint_type",
                format!("unknown complaint type '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parsing() {
        assert_eq!("severe".parse::<DamageSeverity>().unwrap(), DamageSeverity::Severe);
        assert_eq!("NONE".parse::<DamageSeverity>().unwrap(), DamageSeverity::None);
        assert!("catastrophic".parse::<DamageSeverity>().is_err());
        assert!(!DamageSeverity::None.is_damaged());
        assert!(DamageSeverity::Light.is_damaged());
    }

    #[test]
    fn test_complaint_kind_parsing() {
        assert_eq!("behavior".parse::<ComplaintKind>().unwrap(), ComplaintKind::Behavior);
        assert!("fraud".parse::<ComplaintKind>().is_err());
    }

    #[test]
    fn test_counterparty() {
        assert_eq!(Party::Owner.counterparty(), Party::Borrower);
        assert_eq!(Party::Borrower.counterparty(), Party::Owner);
    }
}
