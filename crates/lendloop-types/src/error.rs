//! Error types for LendLoop
//!
//! Every rejected operation is reported to the caller; nothing is swallowed
//! and nothing is retried by the engine itself.

use thiserror::Error;

/// Result type for LendLoop operations
pub type Result<T> = std::result::Result<T, LendError>;

/// LendLoop error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LendError {
    // ========================================================================
    // Token Errors
    // ========================================================================

    /// A ledger debit would drive a balance negative
    #[error("Insufficient funds for {user}: requested {requested}, available {available}")]
    InsufficientFunds {
        user: String,
        requested: u64,
        available: u64,
    },

    /// Pre-transfer balance check failed for a borrow request or approval
    #[error("Insufficient tokens for {user}: need {required}, have {available}")]
    InsufficientTokens {
        user: String,
        required: u64,
        available: u64,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================

    /// Item is disabled, outside its window, or already booked
    #[error("Item {item_id} unavailable: {reason}")]
    ItemUnavailable { item_id: String, reason: String },

    /// Operation is not legal from the current status
    #[error("Invalid transition for {entity}: cannot {action} from {from}")]
    InvalidTransition {
        entity: String,
        from: String,
        action: String,
    },

    /// Wrong party invoking an owner/borrower-only action
    #[error("Not authorized: {reason}")]
    NotAuthorized { reason: String },

    /// Concurrent modification detected
    #[error("Conflict on {entity}: expected version {expected}, found {actual}")]
    Conflict {
        entity: String,
        expected: u64,
        actual: u64,
    },

    // ========================================================================
    // Input Errors
    // ========================================================================

    /// Malformed input
    #[error("Validation failed: {field} - {reason}")]
    ValidationError { field: String, reason: String },

    /// Unknown id
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

impl LendError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-authorized error
    pub fn not_authorized(reason: impl Into<String>) -> Self {
        Self::NotAuthorized {
            reason: reason.into(),
        }
    }

    /// Create an item-unavailable error
    pub fn unavailable(item_id: impl ToString, reason: impl Into<String>) -> Self {
        Self::ItemUnavailable {
            item_id: item_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Only `Conflict` may be retried, and only by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientTokens { .. } => "INSUFFICIENT_TOKENS",
            Self::ItemUnavailable { .. } => "ITEM_UNAVAILABLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::Conflict { .. } => "CONFLICT",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = LendError::InsufficientFunds {
            user: "user_1".to_string(),
            requested: 100,
            available: 50,
        };
        assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");
        assert_eq!(LendError::validation("value", "too high").error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        let conflict = LendError::Conflict {
            entity: "rental_x".to_string(),
            expected: 1,
            actual: 2,
        };
        assert!(conflict.is_retryable());
        assert!(!LendError::not_authorized("owner only").is_retryable());
        assert!(!LendError::not_found("item", "item_x").is_retryable());
    }
}
