//! Notification records
//!
//! One notification targets one member. Every step of a rental, every
//! penalty movement and every reputation sanction produces one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lendloop_types::{NotificationId, UserId};

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RentalRequested,
    RequestApproved,
    RequestRejected,
    RentalCancelled,
    /// One party confirmed handover; the other still has to
    DeliveryConfirmed,
    Delivered,
    ReturnConfirmed,
    RentalCompleted,
    FeedbackRequired,
    PenaltyCreated,
    PenaltyPaid,
    PenaltyPartiallyPaid,
    ReviewReceived,
    ComplaintFiled,
    ComplaintValidated,
    ComplaintDismissed,
    UserBanned,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::RentalRequested => "rental_requested",
            NotificationKind::RequestApproved => "request_approved",
            NotificationKind::RequestRejected => "request_rejected",
            NotificationKind::RentalCancelled => "rental_cancelled",
            NotificationKind::DeliveryConfirmed => "delivery_confirmed",
            NotificationKind::Delivered => "delivered",
            NotificationKind::ReturnConfirmed => "return_confirmed",
            NotificationKind::RentalCompleted => "rental_completed",
            NotificationKind::FeedbackRequired => "feedback_required",
            NotificationKind::PenaltyCreated => "penalty_created",
            NotificationKind::PenaltyPaid => "penalty_paid",
            NotificationKind::PenaltyPartiallyPaid => "penalty_partially_paid",
            NotificationKind::ReviewReceived => "review_received",
            NotificationKind::ComplaintFiled => "complaint_filed",
            NotificationKind::ComplaintValidated => "complaint_validated",
            NotificationKind::ComplaintDismissed => "complaint_dismissed",
            NotificationKind::UserBanned => "user_banned",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message addressed to one member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub target_user: UserId,
    /// Rental, penalty or complaint this is about
    pub related_id: Option<String>,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        target_user: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            kind,
            target_user,
            related_id: None,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            is_read: false,
        }
    }

    /// Link the notification to a rental, penalty or complaint
    pub fn about(mut self, related: impl ToString) -> Self {
        self.related_id = Some(related.to_string());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Short description for logging
    pub fn summary(&self) -> String {
        match &self.related_id {
            Some(related) => format!("[{}] {} ({})", self.kind, self.title, related),
            None => format!("[{}] {}", self.kind, self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_serialization() {
        let user = UserId::new();
        let note = Notification::new(
            NotificationKind::RequestApproved,
            user,
            "Request approved",
            "Your request for Tent was approved",
        )
        .about("rental_123");

        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"type\":\"request_approved\""));
        assert!(json.contains("\"is_read\":false"));

        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_summary() {
        let note = Notification::new(NotificationKind::UserBanned, UserId::new(), "Account banned", "")
            .about("user_1");
        assert_eq!(note.summary(), "[user_banned] Account banned (user_1)");
    }
}
