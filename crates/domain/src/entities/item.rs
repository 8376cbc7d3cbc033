//! Item entities
//!
//! [`Item`] is the ruleset definition; [`InventoryItem`] is a per-character
//! stack of that item sitting in an inventory slot.

use serde::{Deserialize, Serialize};

use crate::{InventoryId, InventoryItemId, ItemId, RulesetId};

/// An item definition.
///
/// Simple data struct: any combination of flags is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub ruleset_id: RulesetId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Whether multiple units share one inventory entry
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub consumable: bool,
    #[serde(default)]
    pub equippable: bool,
}

impl Item {
    pub fn new(ruleset_id: RulesetId, title: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            ruleset_id,
            title: title.into(),
            description: None,
            stackable: false,
            consumable: false,
            equippable: false,
        }
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }
}

/// A stack of one item in a character's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub inventory_id: InventoryId,
    /// The item definition this stack is an instance of
    #[serde(rename = "entityId")]
    pub item_id: ItemId,
    /// Inventory component (slot) the stack is placed in
    #[serde(default)]
    pub component_id: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub equipped: bool,
}

impl InventoryItem {
    pub fn new(inventory_id: InventoryId, item_id: ItemId, quantity: u32) -> Self {
        Self {
            id: InventoryItemId::new(),
            inventory_id,
            item_id,
            component_id: None,
            quantity,
            equipped: false,
        }
    }
}
