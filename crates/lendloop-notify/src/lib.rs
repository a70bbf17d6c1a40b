//! LendLoop Notify - Structured notifications for members
//!
//! The engine emits one [`Notification`] per event through a
//! [`NotificationSink`]. Two sinks ship with the crate:
//!
//! - [`InMemoryInbox`]: per-member inbox (newest first, read/unread, delete)
//!   plus a `tokio::sync::broadcast` feed for live consumers
//! - [`TracingSink`]: writes each notification to the log
//!
//! [`FanoutSink`] combines several.

pub mod notification;
pub mod sink;
pub mod inbox;

pub use notification::*;
pub use sink::*;
pub use inbox::*;
