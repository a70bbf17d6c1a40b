//! LendLoop Types - Canonical domain types for peer-to-peer item lending
//!
//! This crate contains the foundational types shared by every LendLoop crate,
//! with zero dependencies on other lendloop crates:
//!
//! - Identity types (UserId, ItemId, RentalId, ...)
//! - The `Tokens` unit of exchange
//! - Inclusive calendar date ranges
//! - The caller context (`Actor`) passed into every engine call
//! - Return facts handed from the rental layer to penalty assessment
//! - The injectable time source (`Clock`)
//! - The shared error type
//!
//! # Invariants
//!
//! 1. Token amounts are whole, non-negative integers
//! 2. Identity is always explicit - there is no ambient "current user"
//! 3. Failure is explicit - every rejected operation returns a `LendError`

pub mod identity;
pub mod tokens;
pub mod dates;
pub mod actor;
pub mod clock;
pub mod domain;
pub mod returns;
pub mod error;

pub use identity::*;
pub use tokens::*;
pub use dates::*;
pub use actor::*;
pub use clock::*;
pub use domain::*;
pub use returns::*;
pub use error::*;
