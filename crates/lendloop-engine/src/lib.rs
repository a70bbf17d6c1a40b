//! LendLoop Engine - Peer-to-peer item lending on a token economy
//!
//! The engine is the single entry point for the marketplace. It owns the
//! member directory and wires together:
//!
//! - the token ledger (`lendloop-ledger`)
//! - the item catalog (`lendloop-catalog`)
//! - the rental state machine (`lendloop-rental`)
//! - lateness and damage penalties (`lendloop-penalty`)
//! - reviews, complaints and bans (`lendloop-reputation`)
//! - notifications (`lendloop-notify`)
//!
//! # Quick Start
//!
//! ```ignore
//! use lendloop_engine::{Actor, EngineConfig, LendingEngine};
//!
//! let engine = LendingEngine::new(EngineConfig::default())?;
//! let alice = engine.register("alice", "Lisbon").await?;
//! let bob = engine.register("bob", "Lisbon").await?;
//!
//! let drill = engine.create_item(&Actor::new(alice.id), draft).await?;
//! let rental = engine
//!     .request_rental(&Actor::new(bob.id), &drill.id, start, end)
//!     .await?;
//! engine.approve(&Actor::new(alice.id), &rental.id).await?;
//! ```

pub mod config;
pub mod members;
pub mod engine;

pub use config::*;
pub use members::*;
pub use engine::*;

pub use lendloop_catalog::{BrowseFilter, CatalogPolicy, CategoryRule, Item, ItemDraft};
pub use lendloop_ledger::{EntryKind, EntryReason, LedgerEntry};
pub use lendloop_notify::{
    FanoutSink, InMemoryInbox, Notification, NotificationKind, NotificationSink, TracingSink,
};
pub use lendloop_penalty::{Penalty, PenaltyReason, SettlementOutcome, SettlementReport};
pub use lendloop_rental::{Activities, DeliveryOutcome, Rental, RentalStatus, ReturnOutcome};
pub use lendloop_reputation::{
    Complaint, ComplaintDraft, ComplaintOutcome, ComplaintStatus, FeedbackStatus,
    ReputationPolicy, ReputationStats, Review,
};
pub use lendloop_types::*;
