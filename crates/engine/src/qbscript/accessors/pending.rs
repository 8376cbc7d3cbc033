//! Buffered effects of a cascade.
//!
//! Scripts never write to the store. Every mutation lands here under a string
//! key and the caller commits the whole map in one transaction. Keyed entries
//! are last-write-wins. `inventoryAdd` and `inventoryRemove` aggregate.

use std::collections::BTreeMap;

use serde::Serialize;

use questbound_domain::{
    AttributeId, AttributeValue, CharacterAttribute, CharacterId, InventoryItem, InventoryItemId,
};

pub const INVENTORY_ADD_KEY: &str = "inventoryAdd";
pub const INVENTORY_REMOVE_KEY: &str = "inventoryRemove";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PendingUpdate {
    #[serde(rename_all = "camelCase")]
    AttributeValue {
        character_id: CharacterId,
        attribute_id: AttributeId,
        value: AttributeValue,
    },
    #[serde(rename_all = "camelCase")]
    ItemQuantity {
        inventory_item_id: InventoryItemId,
        quantity: u32,
    },
    InventoryAdd { items: Vec<InventoryItem> },
    InventoryRemove { ids: Vec<InventoryItemId> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PendingUpdates {
    entries: BTreeMap<String, PendingUpdate>,
}

impl PendingUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute_key(id: impl std::fmt::Display) -> String {
        format!("characterAttribute:{}", id)
    }

    pub fn inventory_item_key(id: InventoryItemId) -> String {
        format!("inventoryItem:{}", id)
    }

    pub fn get(&self, key: &str) -> Option<&PendingUpdate> {
        self.entries.get(key)
    }

    /// Buffered value for a character attribute, if any.
    pub fn attribute_value(&self, attribute: &CharacterAttribute) -> Option<&AttributeValue> {
        match self.entries.get(&Self::attribute_key(attribute.id)) {
            Some(PendingUpdate::AttributeValue { value, .. }) => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PendingUpdate)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_attribute(&mut self, attribute: &CharacterAttribute) {
        self.entries.insert(
            Self::attribute_key(attribute.id),
            PendingUpdate::AttributeValue {
                character_id: attribute.character_id,
                attribute_id: attribute.attribute_id,
                value: attribute.value.clone(),
            },
        );
    }

    /// Record a new quantity. Items added earlier in this cascade are updated
    /// in place inside `inventoryAdd`.
    pub fn set_item_quantity(&mut self, item: &InventoryItem) {
        if let Some(added) = self.added_mut(item.id) {
            added.quantity = item.quantity;
            return;
        }
        self.entries.insert(
            Self::inventory_item_key(item.id),
            PendingUpdate::ItemQuantity {
                inventory_item_id: item.id,
                quantity: item.quantity,
            },
        );
    }

    pub fn add_inventory_item(&mut self, item: InventoryItem) {
        match self.entries.get_mut(INVENTORY_ADD_KEY) {
            Some(PendingUpdate::InventoryAdd { items }) => items.push(item),
            _ => {
                self.entries.insert(
                    INVENTORY_ADD_KEY.to_string(),
                    PendingUpdate::InventoryAdd { items: vec![item] },
                );
            }
        }
    }

    /// Record a removal. An item added earlier in this cascade is retracted
    /// instead, so the commit never sees both.
    pub fn remove_inventory_item(&mut self, id: InventoryItemId) {
        self.entries.remove(&Self::inventory_item_key(id));

        if let Some(PendingUpdate::InventoryAdd { items }) = self.entries.get_mut(INVENTORY_ADD_KEY)
        {
            let before = items.len();
            items.retain(|item| item.id != id);
            if items.len() != before {
                if items.is_empty() {
                    self.entries.remove(INVENTORY_ADD_KEY);
                }
                return;
            }
        }

        match self.entries.get_mut(INVENTORY_REMOVE_KEY) {
            Some(PendingUpdate::InventoryRemove { ids }) => ids.push(id),
            _ => {
                self.entries.insert(
                    INVENTORY_REMOVE_KEY.to_string(),
                    PendingUpdate::InventoryRemove { ids: vec![id] },
                );
            }
        }
    }

    fn added_mut(&mut self, id: InventoryItemId) -> Option<&mut InventoryItem> {
        match self.entries.get_mut(INVENTORY_ADD_KEY) {
            Some(PendingUpdate::InventoryAdd { items }) => items.iter_mut().find(|i| i.id == id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questbound_domain::{InventoryId, ItemId};

    fn attribute(value: f64) -> CharacterAttribute {
        CharacterAttribute::new(CharacterId::new(), AttributeId::new(), AttributeValue::Number(value))
    }

    #[test]
    fn attribute_writes_are_last_write_wins() {
        let mut pending = PendingUpdates::new();
        let mut hp = attribute(50.0);
        pending.set_attribute(&hp);
        hp.value = AttributeValue::Number(60.0);
        pending.set_attribute(&hp);

        assert_eq!(pending.len(), 1);
        assert_eq!(pending.attribute_value(&hp), Some(&AttributeValue::Number(60.0)));
    }

    #[test]
    fn inventory_keys_aggregate() {
        let mut pending = PendingUpdates::new();
        let inventory = InventoryId::new();
        pending.add_inventory_item(InventoryItem::new(inventory, ItemId::new(), 1));
        pending.add_inventory_item(InventoryItem::new(inventory, ItemId::new(), 1));
        pending.remove_inventory_item(InventoryItemId::new());
        pending.remove_inventory_item(InventoryItemId::new());

        assert!(matches!(
            pending.get(INVENTORY_ADD_KEY),
            Some(PendingUpdate::InventoryAdd { items }) if items.len() == 2
        ));
        assert!(matches!(
            pending.get(INVENTORY_REMOVE_KEY),
            Some(PendingUpdate::InventoryRemove { ids }) if ids.len() == 2
        ));
    }

    #[test]
    fn removing_an_added_item_retracts_it() {
        let mut pending = PendingUpdates::new();
        let item = InventoryItem::new(InventoryId::new(), ItemId::new(), 1);
        pending.add_inventory_item(item.clone());
        pending.remove_inventory_item(item.id);

        assert!(pending.is_empty());
    }

    #[test]
    fn quantity_of_added_item_updates_the_addition() {
        let mut pending = PendingUpdates::new();
        let mut item = InventoryItem::new(InventoryId::new(), ItemId::new(), 2);
        pending.add_inventory_item(item.clone());
        item.quantity = 5;
        pending.set_item_quantity(&item);

        assert_eq!(pending.len(), 1);
        assert!(matches!(
            pending.get(INVENTORY_ADD_KEY),
            Some(PendingUpdate::InventoryAdd { items }) if items[0].quantity == 5
        ));
    }

    #[test]
    fn serializes_as_string_keyed_map() {
        let mut pending = PendingUpdates::new();
        let hp = attribute(12.0);
        pending.set_attribute(&hp);

        let json = serde_json::to_value(&pending).unwrap();
        let entry = &json[PendingUpdates::attribute_key(hp.id)];
        assert_eq!(entry["type"], "attributeValue");
        assert_eq!(entry["value"], 12.0);
    }
}
