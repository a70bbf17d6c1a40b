//! Item registry

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use lendloop_types::{Actor, Clock, ItemId, LendError, Result, SystemClock, Tokens, UserId};

use crate::{BrowseFilter, CatalogPolicy, Item, ItemDraft};

/// In-memory item catalog
///
/// Only an item's owner may edit, toggle or remove it. Removal is not
/// exposed to callers directly: the rental layer decides whether an item
/// still has active transactions before calling [`Catalog::remove`].
#[derive(Clone)]
pub struct Catalog {
    items: Arc<RwLock<HashMap<ItemId, Item>>>,
    policy: Arc<CatalogPolicy>,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    pub fn new(policy: CatalogPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            policy: Arc::new(policy),
            clock,
        }
    }

    pub fn policy(&self) -> &CatalogPolicy {
        &self.policy
    }

    /// List a new item owned by the caller
    pub async fn create_item(&self, actor: &Actor, draft: ItemDraft) -> Result<Item> {
        draft.validate(&self.policy)?;
        let now = self.clock.now();
        let item = Item {
            id: ItemId::new(),
            owner: actor.user,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            value: draft.value,
            daily_price: draft.daily_price,
            images: draft.images,
            availability: draft.availability,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        self.items.write().await.insert(item.id, item.clone());
        info!(item_id = %item.id, owner = %item.owner, "item listed");
        Ok(item)
    }

    /// Replace an item's owner-editable fields
    pub async fn update_item(&self, actor: &Actor, id: &ItemId, draft: ItemDraft) -> Result<Item> {
        draft.validate(&self.policy)?;
        let mut items = self.items.write().await;
        let item = owned_mut(&mut items, actor, id)?;

        item.title = draft.title;
        item.description = draft.description;
        item.category = draft.category;
        item.value = draft.value;
        item.daily_price = draft.daily_price;
        item.images = draft.images;
        item.availability = draft.availability;
        item.updated_at = self.clock.now();

        info!(item_id = %id, "item updated");
        Ok(item.clone())
    }

    /// Flip the owner's availability switch, returning the new state
    pub async fn toggle_availability(&self, actor: &Actor, id: &ItemId) -> Result<bool> {
        let mut items = self.items.write().await;
        let item = owned_mut(&mut items, actor, id)?;
        item.is_available = !item.is_available;
        item.updated_at = self.clock.now();
        info!(item_id = %id, is_available = item.is_available, "item availability toggled");
        Ok(item.is_available)
    }

    /// Remove an item owned by the caller
    pub async fn remove(&self, actor: &Actor, id: &ItemId) -> Result<Item> {
        let mut items = self.items.write().await;
        owned_mut(&mut items, actor, id)?;
        let item = items
            .remove(id)
            .ok_or_else(|| LendError::not_found("item", id))?;
        info!(item_id = %id, "item removed");
        Ok(item)
    }

    pub async fn get(&self, id: &ItemId) -> Result<Item> {
        self.items
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| LendError::not_found("item", id))
    }

    /// All items of an owner, enabled or not
    pub async fn items_of(&self, owner: &UserId) -> Vec<Item> {
        let items = self.items.read().await;
        let mut owned: Vec<Item> = items.values().filter(|i| &i.owner == owner).cloned().collect();
        owned.sort_by_key(|i| i.created_at);
        owned
    }

    /// Enabled items matching `filter`, newest first
    pub async fn browse(&self, filter: &BrowseFilter) -> Vec<Item> {
        let items = self.items.read().await;
        let mut found: Vec<Item> = items.values().filter(|i| filter.matches(i)).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    pub fn categories(&self) -> Vec<String> {
        self.policy.category_names()
    }

    pub fn suggest_daily_tokens(&self, value: u64, category: &str) -> Tokens {
        self.policy.suggest_daily_tokens(value, category)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(CatalogPolicy::default(), Arc::new(SystemClock))
    }
}

fn owned_mut<'a>(
    items: &'a mut HashMap<ItemId, Item>,
    actor: &Actor,
    id: &ItemId,
) -> Result<&'a mut Item> {
    let item = items
        .get_mut(id)
        .ok_or_else(|| LendError::not_found("item", id))?;
    if item.owner != actor.user {
        return Err(LendError::not_authorized(format!(
            "{} does not own {}",
            actor.user, id
        )));
    }
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lendloop_types::{DateRange, ManualClock};
    use std::collections::HashSet;

    fn draft(title: &str, category: &str) -> ItemDraft {
        ItemDraft {
            title: title.to_string(),
            description: "well kept".to_string(),
            category: category.to_string(),
            value: 5_000,
            daily_price: Tokens::new(2),
            images: vec!["img/a.jpg".to_string()],
            availability: DateRange::new(
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            )
            .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let catalog = Catalog::default();
        let owner = Actor::new(UserId::new());
        let item = catalog.create_item(&owner, draft("Tent", "Outdoor")).await.unwrap();

        let fetched = catalog.get(&item.id).await.unwrap();
        assert_eq!(fetched.owner, owner.user);
        assert!(fetched.is_available);
    }

    #[tokio::test]
    async fn test_only_owner_may_edit() {
        let catalog = Catalog::default();
        let owner = Actor::new(UserId::new());
        let stranger = Actor::new(UserId::new());
        let item = catalog.create_item(&owner, draft("Tent", "Outdoor")).await.unwrap();

        let result = catalog.update_item(&stranger, &item.id, draft("Mine now", "Outdoor")).await;
        assert!(matches!(result, Err(LendError::NotAuthorized { .. })));
        let result = catalog.toggle_availability(&stranger, &item.id).await;
        assert!(matches!(result, Err(LendError::NotAuthorized { .. })));
        let result = catalog.remove(&stranger, &item.id).await;
        assert!(matches!(result, Err(LendError::NotAuthorized { .. })));

        let updated = catalog
            .update_item(&owner, &item.id, draft("Big tent", "Outdoor"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Big tent");
    }

    #[tokio::test]
    async fn test_toggle_hides_from_browse() {
        let catalog = Catalog::default();
        let owner = Actor::new(UserId::new());
        let item = catalog.create_item(&owner, draft("Tent", "Outdoor")).await.unwrap();

        assert_eq!(catalog.browse(&BrowseFilter::default()).await.len(), 1);
        assert!(!catalog.toggle_availability(&owner, &item.id).await.unwrap());
        assert!(catalog.browse(&BrowseFilter::default()).await.is_empty());
        assert_eq!(catalog.items_of(&owner.user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_browse_filters() {
        let catalog = Catalog::default();
        let alice = Actor::new(UserId::new());
        let bob = Actor::new(UserId::new());
        catalog.create_item(&alice, draft("Camping tent", "Outdoor")).await.unwrap();
        catalog.create_item(&alice, draft("Projector", "Electronics")).await.unwrap();
        catalog.create_item(&bob, draft("Hiking poles", "Outdoor")).await.unwrap();

        let outdoor = BrowseFilter {
            category: Some("Outdoor".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.browse(&outdoor).await.len(), 2);

        let search = BrowseFilter {
            search: Some("TENT".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.browse(&search).await.len(), 1);

        let bobs = BrowseFilter {
            owners: Some(HashSet::from([bob.user])),
            ..Default::default()
        };
        let found = catalog.browse(&bobs).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Hiking poles");
    }

    #[tokio::test]
    async fn test_timestamps_follow_injected_clock() {
        let clock = Arc::new(ManualClock::on(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()));
        let catalog = Catalog::new(CatalogPolicy::default(), clock.clone());
        let owner = Actor::new(UserId::new());

        let tent = catalog.create_item(&owner, draft("Tent", "Outdoor")).await.unwrap();
        assert_eq!(tent.created_at, clock.now());
        assert_eq!(tent.updated_at, clock.now());

        clock.advance_days(2);
        let stove = catalog.create_item(&owner, draft("Stove", "Outdoor")).await.unwrap();
        catalog.toggle_availability(&owner, &tent.id).await.unwrap();
        assert_eq!(catalog.get(&tent.id).await.unwrap().updated_at, clock.now());
        assert_eq!(catalog.get(&tent.id).await.unwrap().created_at, tent.created_at);

        catalog.toggle_availability(&owner, &tent.id).await.unwrap();
        let newest_first = catalog.browse(&BrowseFilter::default()).await;
        assert_eq!(newest_first[0].id, stove.id);
        assert_eq!(newest_first[1].id, tent.id);
    }

    #[tokio::test]
    async fn test_remove() {
        let catalog = Catalog::default();
        let owner = Actor::new(UserId::new());
        let item = catalog.create_item(&owner, draft("Tent", "Outdoor")).await.unwrap();
        catalog.remove(&owner, &item.id).await.unwrap();
        assert!(matches!(catalog.get(&item.id).await, Err(LendError::NotFound { .. })));
    }
}
