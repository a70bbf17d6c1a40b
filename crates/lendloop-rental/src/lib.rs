//! LendLoop Rental - The borrow transaction lifecycle
//!
//! A rental moves `pending → approved → delivered → returned → completed`,
//! with `rejected` and `cancelled` as early exits. Delivery and return each
//! need a confirmation from both parties; the status only advances once the
//! confirmation set is complete.
//!
//! Tokens move exactly once, from borrower to owner at approval, and back at
//! most once if an approved rental is cancelled.

pub mod status;
pub mod rental;
pub mod desk;

pub use status::*;
pub use rental::*;
pub use desk::*;
