//! Listed items and their validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use lendloop_types::{DateRange, ItemId, LendError, Result, Tokens, UserId};

use crate::CatalogPolicy;

/// An item offered for lending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Declared monetary value, also the basis for damage penalties
    pub value: u64,
    pub daily_price: Tokens,
    /// Already-uploaded image references
    pub images: Vec<String>,
    pub availability: DateRange,
    /// Owner's on/off switch, independent of the availability window
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Whether `range` can be booked, ignoring other rentals
    pub fn check_bookable(&self, range: &DateRange) -> Result<()> {
        if !self.is_available {
            return Err(LendError::unavailable(self.id, "item is disabled by its owner"));
        }
        if !self.availability.contains(range) {
            return Err(LendError::unavailable(
                self.id,
                format!("{} falls outside availability {}", range, self.availability),
            ));
        }
        Ok(())
    }
}

/// Owner-supplied fields for creating or editing an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub value: u64,
    pub daily_price: Tokens,
    pub images: Vec<String>,
    pub availability: DateRange,
}

impl ItemDraft {
    /// Check the draft against catalog policy
    pub fn validate(&self, policy: &CatalogPolicy) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(LendError::validation("title", "must not be empty"));
        }
        if self.value > policy.value_ceiling {
            return Err(LendError::validation(
                "value",
                format!("{} exceeds the ceiling of {}", self.value, policy.value_ceiling),
            ));
        }
        if self.daily_price.is_zero() {
            return Err(LendError::validation("daily_price", "must be at least 1 token"));
        }
        if policy.category(&self.category).is_none() {
            return Err(LendError::validation(
                "category",
                format!("'{}' is not a known category", self.category),
            ));
        }
        let count = self.images.len();
        if count < policy.min_images || count > policy.max_images {
            return Err(LendError::validation(
                "images",
                format!(
                    "{} images given, expected {}..={}",
                    count, policy.min_images, policy.max_images
                ),
            ));
        }
        if self.images.iter().any(|i| i.trim().is_empty()) {
            return Err(LendError::validation("images", "empty image reference"));
        }
        Ok(())
    }
}

/// Browse criteria; only enabled items are ever returned
#[derive(Debug, Clone, Default)]
pub struct BrowseFilter {
    pub category: Option<String>,
    /// Case-insensitive match against title or description
    pub search: Option<String>,
    /// Restrict to these owners (resolved from a location search upstream)
    pub owners: Option<HashSet<UserId>>,
}

impl BrowseFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if !item.is_available {
            return false;
        }
        if let Some(category) = &self.category {
            if &item.category != category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !item.title.to_lowercase().contains(&needle)
                && !item.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(owners) = &self.owners {
            if !owners.contains(&item.owner) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap()
    }

    fn draft() -> ItemDraft {
        ItemDraft {
            title: "Cordless drill".to_string(),
            description: "18V with two batteries".to_string(),
            category: "Tools".to_string(),
            value: 8_000,
            daily_price: Tokens::new(3),
            images: vec!["img/drill-1.jpg".to_string()],
            availability: window(),
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(draft().validate(&CatalogPolicy::default()).is_ok());
    }

    #[test]
    fn test_value_ceiling() {
        let policy = CatalogPolicy::default();
        let mut d = draft();
        d.value = 100_000;
        assert!(d.validate(&policy).is_ok());
        d.value = 100_001;
        assert!(matches!(d.validate(&policy), Err(LendError::ValidationError { .. })));
    }

    #[test]
    fn test_image_bounds() {
        let policy = CatalogPolicy::default();
        let mut d = draft();
        d.images.clear();
        assert!(d.validate(&policy).is_err());
        d.images = (0..5).map(|i| format!("img/{}.jpg", i)).collect();
        assert!(d.validate(&policy).is_ok());
        d.images.push("img/6.jpg".to_string());
        assert!(d.validate(&policy).is_err());
    }

    #[test]
    fn test_unknown_category_and_free_items_rejected() {
        let policy = CatalogPolicy::default();
        let mut d = draft();
        d.category = "Vehicles".to_string();
        assert!(d.validate(&policy).is_err());

        let mut d = draft();
        d.daily_price = Tokens::ZERO;
        assert!(d.validate(&policy).is_err());
    }

    #[test]
    fn test_draft_from_json() {
        let d: ItemDraft = serde_json::from_str(
            r#"{
                "title": "Ladder",
                "description": "3m aluminium",
                "category": "Tools",
                "value": 120,
                "daily_price": 2,
                "images": ["ladder.jpg"],
                "availability": {"start": "2025-06-01", "end": "2025-06-30"}
            }"#,
        )
        .unwrap();
        assert_eq!(d.daily_price, Tokens::new(2));
        assert_eq!(d.availability.days(), 30);
        assert!(d.validate(&CatalogPolicy::default()).is_ok());
    }

    #[test]
    fn test_draft_with_inverted_window_rejected() {
        let result = serde_json::from_str::<ItemDraft>(
            r#"{
                "title": "Ladder",
                "description": "3m aluminium",
                "category": "Tools",
                "value": 120,
                "daily_price": 2,
                "images": ["ladder.jpg"],
                "availability": {"start": "2025-06-30", "end": "2025-06-01"}
            }"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("before start"), "{err}");
    }
}
