//! Engine configuration

use serde::{Deserialize, Serialize};

use lendloop_catalog::CatalogPolicy;
use lendloop_reputation::ReputationPolicy;
use lendloop_types::{LendError, Result, Tokens};

/// Everything the engine can be tuned with
///
/// Every field has a default, so an empty document deserializes to the
/// standard marketplace rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tokens credited to every new member
    #[serde(default = "default_starting_grant")]
    pub starting_grant: u64,

    #[serde(default)]
    pub catalog: CatalogPolicy,

    #[serde(default)]
    pub reputation: ReputationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_grant: default_starting_grant(),
            catalog: CatalogPolicy::default(),
            reputation: ReputationPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn starting_grant(&self) -> Tokens {
        Tokens::new(self.starting_grant)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let catalog = &self.catalog;
        if catalog.min_images > catalog.max_images {
            return Err(LendError::validation(
                "catalog.min_images",
                "must not exceed catalog.max_images",
            ));
        }
        if catalog.value_per_token == 0 {
            return Err(LendError::validation("catalog.value_per_token", "must be positive"));
        }
        if catalog.categories.is_empty() {
            return Err(LendError::validation("catalog.categories", "at least one category is required"));
        }
        if let Some(bad) = catalog
            .categories
            .iter()
            .find(|c| !c.multiplier.is_finite() || c.multiplier <= 0.0)
        {
            return Err(LendError::validation(
                "catalog.categories",
                format!("multiplier for '{}' must be positive", bad.name),
            ));
        }
        if self.reputation.ban_threshold == 0 {
            return Err(LendError::validation("reputation.ban_threshold", "must be positive"));
        }
        Ok(())
    }
}

fn default_starting_grant() -> u64 {
    100
}
