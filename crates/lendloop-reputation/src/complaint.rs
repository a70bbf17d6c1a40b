//! Complaints between rental parties

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use lendloop_types::{ComplaintId, ComplaintKind, RentalId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    /// Counts toward the accused's complaint total
    Valid,
    Dismissed,
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Valid => write!(f, "valid"),
            Self::Dismissed => write!(f, "dismissed"),
        }
    }
}

/// What the complainant submits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintDraft {
    pub accused: UserId,
    pub kind: ComplaintKind,
    pub description: String,
    #[serde(default)]
    pub proof_images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: ComplaintId,
    pub rental_id: RentalId,
    pub complainant: UserId,
    pub accused: UserId,
    pub kind: ComplaintKind,
    pub description: String,
    pub proof_images: Vec<String>,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Complaint {
    pub fn is_valid(&self) -> bool {
        self.status == ComplaintStatus::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_without_proof() {
        let accused = UserId::new();
        let draft: ComplaintDraft = serde_json::from_value(serde_json::json!({
            "accused": accused,
            "kind": "delivery",
            "description": "never showed up",
        }))
        .unwrap();
        assert_eq!(draft.kind, ComplaintKind::Delivery);
        assert!(draft.proof_images.is_empty());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ComplaintStatus::Dismissed.to_string(), "dismissed");
    }
}
