//! Identity types for LendLoop
//!
//! Every entity id is a strongly typed wrapper around a UUID so that a
//! `UserId` can never be handed to an operation expecting an `ItemId`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

// Participants
define_id_type!(UserId, "user", "Unique identifier for a registered member");

// Catalog and lifecycle
define_id_type!(ItemId, "item", "Unique identifier for a lendable item");
define_id_type!(RentalId, "rental", "Unique identifier for a borrow transaction");

// Settlement and reputation
define_id_type!(PenaltyId, "penalty", "Unique identifier for a penalty entry");
define_id_type!(ReviewId, "review", "Unique identifier for a review");
define_id_type!(ComplaintId, "complaint", "Unique identifier for a complaint");

// Ledger and notifications
define_id_type!(EntryId, "entry", "Unique identifier for a ledger entry");
define_id_type!(NotificationId, "notif", "Unique identifier for a notification");
