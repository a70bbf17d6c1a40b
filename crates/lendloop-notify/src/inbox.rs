//! Per-member notification inbox with a live broadcast feed

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use lendloop_types::{LendError, NotificationId, Result, UserId};

use crate::{Notification, NotificationSink};

const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// In-memory inbox
///
/// Stores notifications per target member, newest first, and rebroadcasts
/// each one to live subscribers. Lagging subscribers miss messages; the
/// stored inbox does not.
#[derive(Clone)]
pub struct InMemoryInbox {
    inboxes: Arc<RwLock<HashMap<UserId, Vec<Notification>>>>,
    events: broadcast::Sender<Notification>,
}

impl InMemoryInbox {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inboxes: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Live feed of every notification emitted after subscribing
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    /// A member's notifications, newest first
    pub async fn list(&self, user: &UserId) -> Vec<Notification> {
        self.inboxes
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn unread_count(&self, user: &UserId) -> usize {
        self.inboxes
            .read()
            .await
            .get(user)
            .map(|notes| notes.iter().filter(|n| !n.is_read).count())
            .unwrap_or(0)
    }

    /// Mark one of the member's notifications read
    pub async fn mark_read(&self, user: &UserId, id: &NotificationId) -> Result<()> {
        let mut inboxes = self.inboxes.write().await;
        let note = inboxes
            .get_mut(user)
            .and_then(|notes| notes.iter_mut().find(|n| &n.id == id))
            .ok_or_else(|| LendError::not_found("notification", id))?;
        note.is_read = true;
        Ok(())
    }

    /// Mark everything read, returning how many changed
    pub async fn mark_all_read(&self, user: &UserId) -> usize {
        let mut inboxes = self.inboxes.write().await;
        let mut changed = 0;
        if let Some(notes) = inboxes.get_mut(user) {
            for note in notes.iter_mut().filter(|n| !n.is_read) {
                note.is_read = true;
                changed += 1;
            }
        }
        changed
    }

    pub async fn delete(&self, user: &UserId, id: &NotificationId) -> Result<()> {
        let mut inboxes = self.inboxes.write().await;
        let notes = inboxes
            .get_mut(user)
            .ok_or_else(|| LendError::not_found("notification", id))?;
        let before = notes.len();
        notes.retain(|n| &n.id != id);
        if notes.len() == before {
            return Err(LendError::not_found("notification", id));
        }
        Ok(())
    }
}

impl Default for InMemoryInbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for InMemoryInbox {
    async fn emit(&self, notification: Notification) {
        {
            let mut inboxes = self.inboxes.write().await;
            inboxes
                .entry(notification.target_user)
                .or_default()
                .insert(0, notification.clone());
        }
        // No receivers is fine
        let _ = self.events.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotificationKind;

    fn note(user: UserId, title: &str) -> Notification {
        Notification::new(NotificationKind::RentalRequested, user, title, "")
    }

    #[tokio::test]
    async fn test_newest_first() {
        let inbox = InMemoryInbox::new();
        let user = UserId::new();
        inbox.emit(note(user, "first")).await;
        inbox.emit(note(user, "second")).await;

        let listed = inbox.list(&user).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "second");
        assert_eq!(listed[1].title, "first");
    }

    #[tokio::test]
    async fn test_inboxes_are_per_user() {
        let inbox = InMemoryInbox::new();
        let alice = UserId::new();
        let bob = UserId::new();
        inbox.emit(note(alice, "for alice")).await;

        assert_eq!(inbox.list(&alice).await.len(), 1);
        assert!(inbox.list(&bob).await.is_empty());
        assert_eq!(inbox.unread_count(&bob).await, 0);
    }

    #[tokio::test]
    async fn test_mark_read_and_delete() {
        let inbox = InMemoryInbox::new();
        let user = UserId::new();
        inbox.emit(note(user, "a")).await;
        inbox.emit(note(user, "b")).await;
        assert_eq!(inbox.unread_count(&user).await, 2);

        let id = inbox.list(&user).await[0].id;
        inbox.mark_read(&user, &id).await.unwrap();
        assert_eq!(inbox.unread_count(&user).await, 1);

        inbox.delete(&user, &id).await.unwrap();
        assert_eq!(inbox.list(&user).await.len(), 1);
        assert!(matches!(
            inbox.delete(&user, &id).await,
            Err(LendError::NotFound { .. })
        ));

        assert_eq!(inbox.mark_all_read(&user).await, 1);
        assert_eq!(inbox.unread_count(&user).await, 0);
    }

    #[tokio::test]
    async fn test_cannot_touch_someone_elses_notification() {
        let inbox = InMemoryInbox::new();
        let alice = UserId::new();
        let bob = UserId::new();
        inbox.emit(note(alice, "private")).await;
        let id = inbox.list(&alice).await[0].id;

        assert!(inbox.mark_read(&bob, &id).await.is_err());
        assert!(inbox.delete(&bob, &id).await.is_err());
        assert_eq!(inbox.unread_count(&alice).await, 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_live_events() {
        let inbox = InMemoryInbox::new();
        let mut rx = inbox.subscribe();
        let user = UserId::new();
        inbox.emit(note(user, "live")).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "live");
        assert_eq!(received.target_user, user);
    }
}
