//! Where notifications go

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::Notification;

/// Receiver of engine notifications
///
/// Emission never fails from the engine's point of view: a sink that cannot
/// deliver is expected to log and drop.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, notification: Notification);
}

/// Logs every notification through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn emit(&self, notification: Notification) {
        info!(
            notification_id = %notification.id,
            kind = %notification.kind,
            target_user = %notification.target_user,
            related_id = notification.related_id.as_deref().unwrap_or("-"),
            "{}",
            notification.title
        );
    }
}

/// Forwards each notification to several sinks in order
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn emit(&self, notification: Notification) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(notification.clone()).await;
            }
            last.emit(notification).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryInbox, NotificationKind};
    use lendloop_types::UserId;

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let first = InMemoryInbox::new();
        let second = InMemoryInbox::new();
        let fanout = FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(first.clone()))
            .with(Arc::new(second.clone()));
        assert_eq!(fanout.len(), 3);

        let user = UserId::new();
        fanout
            .emit(Notification::new(NotificationKind::Delivered, user, "Delivered", ""))
            .await;

        assert_eq!(first.list(&user).await.len(), 1);
        assert_eq!(second.list(&user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_fanout_is_noop() {
        let fanout = FanoutSink::new();
        assert!(fanout.is_empty());
        fanout
            .emit(Notification::new(NotificationKind::Delivered, UserId::new(), "x", ""))
            .await;
    }
}
