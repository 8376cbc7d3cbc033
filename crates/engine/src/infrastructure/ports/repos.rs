//! Repository port traits for the ruleset and character store.
//!
//! The runtime only reads through these during evaluation. Writes happen
//! after a run, when the caller commits the buffered pending updates.

use async_trait::async_trait;
use questbound_domain::*;

use super::error::RepoError;
use crate::reactive::DependencyNode;

/// Narrows a script listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptFilter {
    pub enabled: Option<bool>,
    pub entity_type: Option<ScriptEntityType>,
}

impl ScriptFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
            entity_type: None,
        }
    }

    pub fn with_entity_type(mut self, entity_type: ScriptEntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn matches(&self, script: &Script) -> bool {
        self.enabled.map_or(true, |enabled| script.enabled == enabled)
            && self
                .entity_type
                .map_or(true, |entity_type| script.entity_type == entity_type)
    }
}

// =============================================================================
// Scripts
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScriptRepo: Send + Sync {
    async fn list_scripts(
        &self,
        ruleset_id: RulesetId,
        filter: ScriptFilter,
    ) -> Result<Vec<Script>, RepoError>;
    async fn get_script(&self, id: ScriptId) -> Result<Option<Script>, RepoError>;
}

// =============================================================================
// Ruleset definitions
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RulesetRepo: Send + Sync {
    async fn list_attributes(&self, ruleset_id: RulesetId) -> Result<Vec<Attribute>, RepoError>;
    async fn list_items(&self, ruleset_id: RulesetId) -> Result<Vec<Item>, RepoError>;
    async fn list_actions(&self, ruleset_id: RulesetId) -> Result<Vec<Action>, RepoError>;
    async fn list_charts(&self, ruleset_id: RulesetId) -> Result<Vec<Chart>, RepoError>;
    async fn get_chart(&self, id: ChartId) -> Result<Option<Chart>, RepoError>;
    async fn get_archetype(&self, id: ArchetypeId) -> Result<Option<Archetype>, RepoError>;
}

// =============================================================================
// Characters
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterRepo: Send + Sync {
    async fn get_character(&self, id: CharacterId) -> Result<Option<Character>, RepoError>;
    async fn get_character_attribute(
        &self,
        character_id: CharacterId,
        attribute_id: AttributeId,
    ) -> Result<Option<CharacterAttribute>, RepoError>;
    async fn list_character_attributes(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<CharacterAttribute>, RepoError>;
    async fn list_inventory_items(
        &self,
        inventory_id: InventoryId,
    ) -> Result<Vec<InventoryItem>, RepoError>;
}

// =============================================================================
// Dependency graph persistence
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DependencyGraphRepo: Send + Sync {
    /// Replace every stored node of the ruleset.
    async fn save_nodes(
        &self,
        ruleset_id: RulesetId,
        nodes: Vec<DependencyNode>,
    ) -> Result<(), RepoError>;
    async fn load_nodes(&self, ruleset_id: RulesetId) -> Result<Vec<DependencyNode>, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_enabled_and_type() {
        let ruleset = RulesetId::new();
        let script = Script::for_entity(
            ruleset,
            "HP",
            ScriptEntityType::Attribute,
            AttributeId::new(),
            "",
        );
        assert!(ScriptFilter::all().matches(&script));
        assert!(ScriptFilter::enabled().matches(&script));
        assert!(!ScriptFilter::enabled().matches(&script.clone().disabled()));
        assert!(!ScriptFilter::all()
            .with_entity_type(ScriptEntityType::Item)
            .matches(&script));
    }
}
