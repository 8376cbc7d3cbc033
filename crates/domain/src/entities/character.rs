//! Character, action, and archetype records.
//!
//! These carry only what the script runtime needs: identity, titles for
//! title-based lookup, and the inventory a character's items live in.

use serde::{Deserialize, Serialize};

use crate::{ActionId, ArchetypeId, CharacterId, InventoryId, RulesetId};

/// A character playing under a ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub ruleset_id: RulesetId,
    pub name: String,
    pub inventory_id: InventoryId,
}

impl Character {
    pub fn new(ruleset_id: RulesetId, name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            ruleset_id,
            name: name.into(),
            inventory_id: InventoryId::new(),
        }
    }

    pub fn with_id(mut self, id: CharacterId) -> Self {
        self.id = id;
        self
    }
}

/// An action a character can activate (a spell, an attack, a rest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    pub ruleset_id: RulesetId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Action {
    pub fn new(ruleset_id: RulesetId, title: impl Into<String>) -> Self {
        Self {
            id: ActionId::new(),
            ruleset_id,
            title: title.into(),
            description: None,
        }
    }
}

/// An archetype (class, ancestry, background) that can be added to a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archetype {
    pub id: ArchetypeId,
    pub ruleset_id: RulesetId,
    pub name: String,
}

impl Archetype {
    pub fn new(ruleset_id: RulesetId, name: impl Into<String>) -> Self {
        Self {
            id: ArchetypeId::new(),
            ruleset_id,
            name: name.into(),
        }
    }
}
