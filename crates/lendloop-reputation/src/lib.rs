//! LendLoop Reputation - Reviews, complaints and sanctions
//!
//! Both parties of a completed rental owe each other a review. Complaints
//! start pending and only count once found valid; the twentieth valid
//! complaint (configurable) bans the accused for good.
//!
//! The book never blocks the rental state machine. Callers ask
//! [`ReputationBook::feedback_required`] and gate their own flow on it.

pub mod feedback;
pub mod complaint;
pub mod book;

pub use feedback::*;
pub use complaint::*;
pub use book::*;
