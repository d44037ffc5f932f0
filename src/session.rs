//! The level session: which level is active and what the player has collected so far.
//!
//! One session is created when preloading finishes and lives until the app exits. Level changes
//! go through `change_level`, which decides whether the inventory survives the switch.

use bevy::prelude::*;
use serde::Deserialize;

use crate::config::LevelCatalog;
use crate::error::ConfigurationError;
use crate::inventory::Inventory;

/// What happens to the inventory when the player moves to another level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryPolicy {
    /// Keep every collected item across levels.
    #[default]
    Preserve,
    /// Start every level with an empty inventory.
    Reset,
}

#[derive(Resource, Debug, Clone)]
pub struct LevelSession {
    current_level: String,
    pub inventory: Inventory,
    policy: InventoryPolicy,
}

impl LevelSession {
    pub fn new(start_level: impl Into<String>, policy: InventoryPolicy) -> Self {
        Self {
            current_level: start_level.into(),
            inventory: Inventory::default(),
            policy,
        }
    }

    pub fn from_catalog(catalog: &LevelCatalog) -> Self {
        Self::new(catalog.start_level.clone(), catalog.inventory_on_level_change)
    }

    pub fn current_level(&self) -> &str {
        &self.current_level
    }

    pub fn policy(&self) -> InventoryPolicy {
        self.policy
    }

    /// Switches the session to `level`. Unknown identifiers leave the session untouched.
    pub fn change_level(
        &mut self,
        catalog: &LevelCatalog,
        level: &str,
    ) -> Result<(), ConfigurationError> {
        catalog.level(level)?;

        self.current_level = level.to_owned();
        if self.policy == InventoryPolicy::Reset {
            self.inventory.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;

    fn session_with_mushrooms(policy: InventoryPolicy) -> (LevelCatalog, LevelSession) {
        let catalog = LevelCatalog::from_json(SAMPLE).unwrap();
        let mut session = LevelSession::new("level1", policy);
        session.inventory.collect("green_mushroom");
        session.inventory.collect("green_mushroom");
        (catalog, session)
    }

    #[test]
    fn default_policy_preserves_inventory() {
        let catalog = LevelCatalog::from_json(SAMPLE).unwrap();
        let session = LevelSession::from_catalog(&catalog);
        assert_eq!(session.policy(), InventoryPolicy::Preserve);
        assert_eq!(session.current_level(), "level1");
        assert!(session.inventory.is_empty());
    }

    #[test]
    fn preserve_keeps_items_across_levels() {
        let (catalog, mut session) = session_with_mushrooms(InventoryPolicy::Preserve);
        session.change_level(&catalog, "level2").unwrap();

        assert_eq!(session.current_level(), "level2");
        assert_eq!(session.inventory.count("green_mushroom"), 2);
    }

    #[test]
    fn reset_clears_items_on_level_change() {
        let (catalog, mut session) = session_with_mushrooms(InventoryPolicy::Reset);
        session.change_level(&catalog, "level2").unwrap();

        assert_eq!(session.current_level(), "level2");
        assert!(session.inventory.is_empty());
    }

    #[test]
    fn unknown_level_is_rejected_and_nothing_changes() {
        let (catalog, mut session) = session_with_mushrooms(InventoryPolicy::Reset);
        let err = session.change_level(&catalog, "level9").unwrap_err();

        assert_eq!(err, ConfigurationError::UnknownLevel("level9".to_owned()));
        assert_eq!(session.current_level(), "level1");
        assert_eq!(session.inventory.count("green_mushroom"), 2);
    }

    #[test]
    fn policy_parses_from_snake_case() {
        let policy: InventoryPolicy = serde_json::from_str(r#""reset""#).unwrap();
        assert_eq!(policy, InventoryPolicy::Reset);
    }
}
