//! LendLoop Penalty - Lateness and damage penalties
//!
//! Penalties are assessed once, when a rental completes, from the facts the
//! rental layer hands over:
//!
//! - late return: `daily_price × days past the agreed end`
//! - damage: a share of the item's declared value (light ¼, medium ⅓,
//!   high ½, severe all of it), one value unit per token
//!
//! They are recorded unpaid and settled later, possibly in several partial
//! payments, always toward the item owner.

pub mod penalty;
pub mod book;

pub use penalty::*;
pub use book::*;
