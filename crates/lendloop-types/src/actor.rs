//! Caller context
//!
//! Every engine operation receives the authenticated identity of its caller
//! explicitly. The context can also carry the entity version the caller last
//! observed, turning the call into a compare-and-swap.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{LendError, Result, UserId};

/// The authenticated user invoking an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user: UserId,
    /// Version of the target entity the caller last observed, if any
    pub expected_version: Option<u64>,
}

impl Actor {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            expected_version: None,
        }
    }

    /// Require the target entity to still be at `version`
    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Fail with `Conflict` if the caller pinned a version that has moved on
    pub fn check_version(&self, entity: impl fmt::Display, actual: u64) -> Result<()> {
        match self.expected_version {
            Some(expected) if expected != actual => Err(LendError::Conflict {
                entity: entity.to_string(),
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }
}

impl From<UserId> for Actor {
    fn from(user: UserId) -> Self {
        Self::new(user)
    }
}
