//! Registered members

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use lendloop_types::{LendError, Result, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub username: String,
    /// Free-text place name used for browsing by location
    pub location: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Default)]
struct Directory {
    members: HashMap<UserId, Member>,
    /// Lowercased username to id
    usernames: HashMap<String, UserId>,
}

/// Member directory with case-insensitive unique usernames
#[derive(Clone, Default)]
pub struct MemberRegistry {
    directory: Arc<RwLock<Directory>>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        username: &str,
        location: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<Member> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LendError::validation("username", "must not be empty"));
        }
        let key = username.to_lowercase();

        let mut directory = self.directory.write().await;
        if directory.usernames.contains_key(&key) {
            return Err(LendError::validation(
                "username",
                format!("'{}' is already taken", username),
            ));
        }

        let member = Member {
            id: UserId::new(),
            username: username.to_string(),
            location: location.trim().to_string(),
            joined_at,
        };
        directory.usernames.insert(key, member.id);
        directory.members.insert(member.id, member.clone());
        Ok(member)
    }

    /// Undo a registration whose follow-up steps failed
    pub(crate) async fn forget(&self, id: &UserId) {
        let mut directory = self.directory.write().await;
        if let Some(member) = directory.members.remove(id) {
            directory.usernames.remove(&member.username.to_lowercase());
        }
    }

    pub async fn get(&self, id: &UserId) -> Result<Member> {
        self.directory
            .read()
            .await
            .members
            .get(id)
            .cloned()
            .ok_or_else(|| LendError::not_found("member", id))
    }

    pub async fn by_username(&self, username: &str) -> Result<Member> {
        let directory = self.directory.read().await;
        directory
            .usernames
            .get(&username.trim().to_lowercase())
            .and_then(|id| directory.members.get(id))
            .cloned()
            .ok_or_else(|| LendError::not_found("member", username))
    }

    /// Members whose location contains `query`, ignoring case
    pub async fn in_location(&self, query: &str) -> HashSet<UserId> {
        let needle = query.trim().to_lowercase();
        self.directory
            .read()
            .await
            .members
            .values()
            .filter(|m| m.location.to_lowercase().contains(&needle))
            .map(|m| m.id)
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.directory.read().await.members.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.directory.read().await.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = MemberRegistry::new();
        let alice = registry.register("Alice", "Lisbon", Utc::now()).await.unwrap();

        assert_eq!(registry.get(&alice.id).await.unwrap().username, "Alice");
        assert_eq!(registry.by_username("alice").await.unwrap().id, alice.id);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_usernames_are_unique_ignoring_case() {
        let registry = MemberRegistry::new();
        registry.register("Alice", "Lisbon", Utc::now()).await.unwrap();
        let dup = registry.register("ALICE", "Porto", Utc::now()).await;
        assert!(matches!(dup, Err(LendError::ValidationError { .. })));

        let blank = registry.register("   ", "Porto", Utc::now()).await;
        assert!(matches!(blank, Err(LendError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_location_search() {
        let registry = MemberRegistry::new();
        let a = registry.register("a", "Lisbon, Alfama", Utc::now()).await.unwrap();
        let b = registry.register("b", "lisbon", Utc::now()).await.unwrap();
        registry.register("c", "Porto", Utc::now()).await.unwrap();

        let found = registry.in_location("LISBON").await;
        assert_eq!(found, HashSet::from([a.id, b.id]));
    }

    #[tokio::test]
    async fn test_forget_frees_the_username() {
        let registry = MemberRegistry::new();
        let a = registry.register("a", "x", Utc::now()).await.unwrap();
        registry.forget(&a.id).await;
        assert!(registry.is_empty().await);
        registry.register("A", "x", Utc::now()).await.unwrap();
    }
}
