//! Rental lifecycle states and the transitions between them
//!
//! ```text
//! pending ──approve──▶ approved ──deliver──▶ delivered ──return──▶ returned ──complete──▶ completed
//!    │                    │
//!    ├──reject──▶ rejected│
//!    └──cancel──▶ cancelled ◀──cancel──┘
//! ```
//!
//! The graph is acyclic and nothing leaves a terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;

use lendloop_types::Party;

/// Where a rental is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    /// Requested by the borrower, waiting for the owner
    Pending,
    /// Accepted by the owner; tokens have moved
    Approved,
    /// Both parties confirmed the handover
    Delivered,
    /// Both parties confirmed the return; penalties are being assessed
    Returned,
    Completed,
    Rejected,
    Cancelled,
}

impl RentalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// Still in progress (blocks item deletion)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Delivered)
    }

    /// Holds the item's dates against other approvals
    pub fn holds_dates(&self) -> bool {
        matches!(self, Self::Approved | Self::Delivered)
    }

    /// The parties may talk to each other
    pub fn allows_chat(&self) -> bool {
        matches!(self, Self::Approved | Self::Delivered)
    }

    /// Next status for `action`, or `None` if the move is illegal
    pub fn next(self, action: RentalAction) -> Option<RentalStatus> {
        use RentalAction::*;
        use RentalStatus::*;

        match (self, action) {
            (Pending, Approve) => Some(Approved),
            (Pending, Reject) => Some(Rejected),
            (Pending | Approved, Cancel) => Some(Cancelled),
            (Approved, Deliver) => Some(Delivered),
            (Delivered, Return) => Some(Returned),
            (Returned, Complete) => Some(Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Delivered => "delivered",
            Self::Returned => "returned",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that moves a rental forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalAction {
    Approve,
    Reject,
    Cancel,
    Deliver,
    Return,
    Complete,
}

impl fmt::Display for RentalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Deliver => "confirm delivery",
            Self::Return => "confirm return",
            Self::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Which parties have confirmed a two-sided step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationSet {
    pub owner: bool,
    pub borrower: bool,
}

impl ConfirmationSet {
    pub fn has(&self, party: Party) -> bool {
        match party {
            Party::Owner => self.owner,
            Party::Borrower => self.borrower,
        }
    }

    /// Record `party`'s confirmation; false if it was already there
    pub fn confirm(&mut self, party: Party) -> bool {
        let slot = match party {
            Party::Owner => &mut self.owner,
            Party::Borrower => &mut self.borrower,
        };
        let added = !*slot;
        *slot = true;
        added
    }

    pub fn is_complete(&self) -> bool {
        self.owner && self.borrower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [RentalStatus; 7] = [
        RentalStatus::Pending,
        RentalStatus::Approved,
        RentalStatus::Delivered,
        RentalStatus::Returned,
        RentalStatus::Completed,
        RentalStatus::Rejected,
        RentalStatus::Cancelled,
    ];

    const ALL_ACTIONS: [RentalAction; 6] = [
        RentalAction::Approve,
        RentalAction::Reject,
        RentalAction::Cancel,
        RentalAction::Deliver,
        RentalAction::Return,
        RentalAction::Complete,
    ];

    #[test]
    fn test_happy_path() {
        let mut status = RentalStatus::Pending;
        for action in [
            RentalAction::Approve,
            RentalAction::Deliver,
            RentalAction::Return,
            RentalAction::Complete,
        ] {
            status = status.next(action).unwrap();
        }
        assert_eq!(status, RentalStatus::Completed);
    }

    #[test]
    fn test_nothing_leaves_a_terminal_state() {
        for status in ALL_STATUSES.iter().filter(|s| s.is_terminal()) {
            for action in ALL_ACTIONS {
                assert_eq!(status.next(action), None, "{} -> {}", status, action);
            }
        }
    }

    #[test]
    fn test_cancel_only_before_delivery() {
        assert_eq!(RentalStatus::Pending.next(RentalAction::Cancel), Some(RentalStatus::Cancelled));
        assert_eq!(RentalStatus::Approved.next(RentalAction::Cancel), Some(RentalStatus::Cancelled));
        assert_eq!(RentalStatus::Delivered.next(RentalAction::Cancel), None);
        assert_eq!(RentalStatus::Returned.next(RentalAction::Cancel), None);
    }

    #[test]
    fn test_reject_only_from_pending() {
        assert_eq!(RentalStatus::Approved.next(RentalAction::Reject), None);
    }

    #[test]
    fn test_graph_is_acyclic() {
        // Walk every path from pending; none may revisit a status.
        fn walk(status: RentalStatus, seen: &mut Vec<RentalStatus>) {
            assert!(!seen.contains(&status), "cycle through {}", status);
            seen.push(status);
            for action in ALL_ACTIONS {
                if let Some(next) = status.next(action) {
                    walk(next, seen);
                }
            }
            seen.pop();
        }
        walk(RentalStatus::Pending, &mut Vec::new());
    }

    #[test]
    fn test_confirmation_set() {
        let mut set = ConfirmationSet::default();
        assert!(set.confirm(Party::Owner));
        assert!(!set.confirm(Party::Owner));
        assert!(!set.is_complete());
        assert!(set.confirm(Party::Borrower));
        assert!(set.is_complete());
        assert!(set.has(Party::Borrower));
    }
}
