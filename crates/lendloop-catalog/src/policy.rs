//! Catalog rules supplied by configuration

use serde::{Deserialize, Serialize};

use lendloop_types::Tokens;

/// A category in the taxonomy, with its price-suggestion multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl CategoryRule {
    pub fn new(name: impl Into<String>, multiplier: f64) -> Self {
        Self {
            name: name.into(),
            multiplier,
        }
    }
}

/// Validation limits and taxonomy for listed items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPolicy {
    /// Highest monetary value an item may declare
    #[serde(default = "default_value_ceiling")]
    pub value_ceiling: u64,

    #[serde(default = "default_min_images")]
    pub min_images: usize,

    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Value units per suggested daily token before the category multiplier
    #[serde(default = "default_value_per_token")]
    pub value_per_token: u64,

    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRule>,
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self {
            value_ceiling: default_value_ceiling(),
            min_images: default_min_images(),
            max_images: default_max_images(),
            value_per_token: default_value_per_token(),
            categories: default_categories(),
        }
    }
}

impl CatalogPolicy {
    pub fn category(&self, name: &str) -> Option<&CategoryRule> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Advisory daily price for an item of `value` in `category`
    ///
    /// Never used for validation: owners may charge whatever they like.
    /// Unknown categories use a multiplier of 1.
    pub fn suggest_daily_tokens(&self, value: u64, category: &str) -> Tokens {
        let base = (value / self.value_per_token.max(1)).max(1);
        let multiplier = self.category(category).map(|c| c.multiplier).unwrap_or(1.0);
        let suggested = (base as f64 * multiplier).floor() as u64;
        Tokens::new(suggested.max(1))
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_value_ceiling() -> u64 {
    100_000
}

fn default_min_images() -> usize {
    1
}

fn default_max_images() -> usize {
    5
}

fn default_value_per_token() -> u64 {
    1_000
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("Tools", 1.2),
        CategoryRule::new("Electronics", 1.5),
        CategoryRule::new("Outdoor", 1.2),
        CategoryRule::new("Home & Kitchen", 1.0),
        CategoryRule::new("Books & Stationery", 0.8),
        CategoryRule::new("Sports & Fitness", 1.1),
        CategoryRule::new("Event Gear", 1.3),
        CategoryRule::new("Miscellaneous", 1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_taxonomy() {
        let policy = CatalogPolicy::default();
        assert_eq!(policy.categories.len(), 8);
        assert!(policy.category("Electronics").is_some());
        assert!(policy.category("Vehicles").is_none());
    }

    #[test]
    fn test_suggested_tokens() {
        let policy = CatalogPolicy::default();
        // 20_000 / 1000 = 20, x1.5
        assert_eq!(policy.suggest_daily_tokens(20_000, "Electronics"), Tokens::new(30));
        // 5_500 / 1000 = 5, x1.2 = 6
        assert_eq!(policy.suggest_daily_tokens(5_500, "Tools"), Tokens::new(6));
        // cheap items still suggest at least one token
        assert_eq!(policy.suggest_daily_tokens(300, "Books & Stationery"), Tokens::new(1));
        assert_eq!(policy.suggest_daily_tokens(3_000, "Unknown"), Tokens::new(3));
    }
}
