//! Inventory helpers on character accessors.
//!
//! Stackable items grow the first matching stack. Non-stackable items are
//! one inventory entry per unit. Removals drain entries in inventory order.

use questbound_domain::{CharacterId, InventoryItem, InventoryItemId, Item};

use super::runtime_state::RuntimeState;
use crate::qbscript::error::EvaluationError;
use crate::qbscript::value::{ObjectRef, Value};

/// Most instances of a non-stackable item one `addItem`/`setItem` may create.
pub const MAX_ITEM_INSTANCES: u32 = 1000;

impl RuntimeState {
    fn item_definition(&self, title: &str) -> Result<Item, EvaluationError> {
        self.ruleset()
            .item_by_title(title)
            .cloned()
            .ok_or_else(|| EvaluationError::new(format!("Item '{}' not found", title)))
    }

    /// Inventory entries of the item with this title, in inventory order.
    pub(crate) fn find_items(
        &self,
        character_id: CharacterId,
        title: &str,
    ) -> Result<Vec<InventoryItemId>, EvaluationError> {
        let Some(item) = self.ruleset().item_by_title(title) else {
            return Ok(Vec::new());
        };
        Ok(self
            .sheet(character_id)?
            .inventory
            .iter()
            .filter(|entry| entry.item_id == item.id)
            .map(|entry| entry.id)
            .collect())
    }

    pub(crate) fn item_count(&self, character_id: CharacterId, title: &str) -> Result<u32, EvaluationError> {
        let ids = self.find_items(character_id, title)?;
        let sheet = self.sheet(character_id)?;
        Ok(ids
            .iter()
            .filter_map(|id| sheet.inventory_item(*id))
            .fold(0u32, |total, entry| total.saturating_add(entry.quantity)))
    }

    pub(crate) fn add_item(
        &mut self,
        character_id: CharacterId,
        title: &str,
        quantity: u32,
    ) -> Result<(), EvaluationError> {
        if quantity == 0 {
            return Ok(());
        }
        let item = self.item_definition(title)?;
        let existing = self.find_items(character_id, title)?.first().copied();
        let sheet = self.sheet_mut(character_id)?;
        let inventory_id = sheet.character.inventory_id;

        if item.stackable {
            if let Some(entry) = existing.and_then(|id| sheet.inventory.iter_mut().find(|e| e.id == id)) {
                entry.quantity = entry.quantity.saturating_add(quantity);
                let snapshot = entry.clone();
                self.pending.set_item_quantity(&snapshot);
                return Ok(());
            }
            let entry = InventoryItem::new(inventory_id, item.id, quantity);
            sheet.inventory.push(entry.clone());
            self.pending.add_inventory_item(entry);
            return Ok(());
        }

        if quantity > MAX_ITEM_INSTANCES {
            return Err(EvaluationError::new(format!(
                "Cannot add {} '{}' at once; non-stackable items are limited to {}",
                quantity, title, MAX_ITEM_INSTANCES
            )));
        }
        let entries: Vec<InventoryItem> = (0..quantity)
            .map(|_| InventoryItem::new(inventory_id, item.id, 1))
            .collect();
        sheet.inventory.extend(entries.iter().cloned());
        for entry in entries {
            self.pending.add_inventory_item(entry);
        }
        Ok(())
    }

    /// Remove up to `quantity` units. Returns how many were removed.
    pub(crate) fn remove_item(
        &mut self,
        character_id: CharacterId,
        title: &str,
        quantity: u32,
    ) -> Result<u32, EvaluationError> {
        let ids = self.find_items(character_id, title)?;
        let mut remaining = quantity;

        for id in ids {
            if remaining == 0 {
                break;
            }
            let sheet = self.sheet_mut(character_id)?;
            let Some(position) = sheet.inventory.iter().position(|e| e.id == id) else {
                continue;
            };
            let entry = &mut sheet.inventory[position];
            if entry.quantity > remaining {
                entry.quantity -= remaining;
                remaining = 0;
                let snapshot = entry.clone();
                self.pending.set_item_quantity(&snapshot);
            } else {
                remaining -= entry.quantity;
                sheet.inventory.remove(position);
                self.pending.remove_inventory_item(id);
            }
        }
        Ok(quantity - remaining)
    }

    /// Make the character hold exactly `quantity` units.
    pub(crate) fn set_item(
        &mut self,
        character_id: CharacterId,
        title: &str,
        quantity: u32,
    ) -> Result<(), EvaluationError> {
        let current = self.item_count(character_id, title)?;
        if quantity > current {
            self.add_item(character_id, title, quantity - current)
        } else {
            self.remove_item(character_id, title, current - quantity)
                .map(|_| ())
        }
    }

    pub(crate) fn item_property(
        &self,
        character_id: CharacterId,
        inventory_item_id: InventoryItemId,
        property: &str,
    ) -> Result<Value, EvaluationError> {
        let entry = self
            .sheet(character_id)?
            .inventory_item(inventory_item_id)
            .ok_or_else(|| EvaluationError::new("Item is no longer in the inventory"))?;
        let item = self
            .ruleset()
            .item(entry.item_id)
            .ok_or_else(|| EvaluationError::new(format!("Item {} not found", entry.item_id)))?;

        let value = match property {
            "title" => Value::from(item.title.as_str()),
            "description" => item
                .description
                .as_deref()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "quantity" => Value::Number(f64::from(entry.quantity)),
            "equipped" => Value::Boolean(entry.equipped),
            other => {
                return Err(EvaluationError::new(format!(
                    "Unknown property '{}' on item '{}'",
                    other, item.title
                )))
            }
        };
        Ok(value)
    }

    pub(crate) fn item_refs(
        &self,
        character_id: CharacterId,
        title: &str,
    ) -> Result<Vec<Value>, EvaluationError> {
        Ok(self
            .find_items(character_id, title)?
            .into_iter()
            .map(|inventory_item_id| {
                Value::Object(ObjectRef::Item {
                    character_id,
                    inventory_item_id,
                })
            })
            .collect())
    }
}

/// Parse an item quantity argument: a non-negative whole number.
pub(crate) fn quantity_arg(value: Option<&Value>, method: &str) -> Result<u32, EvaluationError> {
    let Some(value) = value else {
        return Ok(1);
    };
    match value {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX) => {
            Ok(*n as u32)
        }
        other => Err(EvaluationError::new(format!(
            "{}() expects a whole non-negative quantity, got {}",
            method, other
        ))),
    }
}
