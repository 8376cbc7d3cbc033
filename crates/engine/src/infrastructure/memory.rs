//! In-memory adapter for every repository port.
//!
//! Holds a whole ruleset world (definitions, scripts, characters and their
//! inventories) behind one `RwLock`. Loaded from a JSON fixture for the CLI
//! and end-to-end tests. Committing a cascade's [`PendingUpdates`] takes the
//! write lock once, so readers never observe half of a commit.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use questbound_domain::*;

use super::ports::{
    CharacterRepo, DependencyGraphRepo, RepoError, RulesetRepo, ScriptFilter, ScriptRepo,
};
use crate::qbscript::{PendingUpdate, PendingUpdates};
use crate::reactive::DependencyNode;

/// On-disk shape of a store. Every list is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreFixture {
    pub attributes: Vec<Attribute>,
    pub items: Vec<Item>,
    pub actions: Vec<Action>,
    pub charts: Vec<Chart>,
    pub archetypes: Vec<Archetype>,
    pub scripts: Vec<Script>,
    pub characters: Vec<Character>,
    pub character_attributes: Vec<CharacterAttribute>,
    pub inventory_items: Vec<InventoryItem>,
}

#[derive(Debug, Default)]
struct StoreData {
    attributes: Vec<Attribute>,
    items: Vec<Item>,
    actions: Vec<Action>,
    charts: Vec<Chart>,
    archetypes: Vec<Archetype>,
    scripts: Vec<Script>,
    characters: HashMap<CharacterId, Character>,
    character_attributes: Vec<CharacterAttribute>,
    inventory_items: Vec<InventoryItem>,
    graph_nodes: HashMap<RulesetId, Vec<DependencyNode>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: StoreFixture) -> Result<Self, RepoError> {
        for script in &fixture.scripts {
            script
                .validate()
                .map_err(|e| RepoError::constraint(format!("Script '{}': {}", script.name, e)))?;
        }
        Ok(Self {
            data: RwLock::new(StoreData {
                attributes: fixture.attributes,
                items: fixture.items,
                actions: fixture.actions,
                charts: fixture.charts,
                archetypes: fixture.archetypes,
                scripts: fixture.scripts,
                characters: fixture
                    .characters
                    .into_iter()
                    .map(|character| (character.id, character))
                    .collect(),
                character_attributes: fixture.character_attributes,
                inventory_items: fixture.inventory_items,
                graph_nodes: HashMap::new(),
            }),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, RepoError> {
        let fixture: StoreFixture =
            serde_json::from_str(json).map_err(RepoError::serialization)?;
        Self::from_fixture(fixture)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepoError::database("read_fixture", format!("{}: {}", path.display(), e)))?;
        let store = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), "Loaded store fixture");
        Ok(store)
    }

    pub async fn insert_script(&self, script: Script) {
        let mut data = self.data.write().await;
        data.scripts.retain(|existing| existing.id != script.id);
        data.scripts.push(script);
    }

    pub async fn insert_attribute(&self, attribute: Attribute) {
        let mut data = self.data.write().await;
        data.attributes.retain(|existing| existing.id != attribute.id);
        data.attributes.push(attribute);
    }

    pub async fn insert_item(&self, item: Item) {
        let mut data = self.data.write().await;
        data.items.retain(|existing| existing.id != item.id);
        data.items.push(item);
    }

    pub async fn insert_action(&self, action: Action) {
        let mut data = self.data.write().await;
        data.actions.retain(|existing| existing.id != action.id);
        data.actions.push(action);
    }

    pub async fn insert_archetype(&self, archetype: Archetype) {
        let mut data = self.data.write().await;
        data.archetypes.retain(|existing| existing.id != archetype.id);
        data.archetypes.push(archetype);
    }

    pub async fn insert_character(&self, character: Character) {
        self.data
            .write()
            .await
            .characters
            .insert(character.id, character);
    }

    /// Every ruleset with at least one attribute or script, sorted.
    pub async fn ruleset_ids(&self) -> Vec<RulesetId> {
        let data = self.data.read().await;
        let mut ids: Vec<RulesetId> = data
            .attributes
            .iter()
            .map(|a| a.ruleset_id)
            .chain(data.scripts.iter().map(|s| s.ruleset_id))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Find a character by exact name.
    pub async fn find_character(&self, name: &str) -> Option<Character> {
        self.data
            .read()
            .await
            .characters
            .values()
            .find(|character| character.name == name)
            .cloned()
    }

    pub async fn find_script(&self, name: &str) -> Option<Script> {
        self.data
            .read()
            .await
            .scripts
            .iter()
            .find(|script| script.name == name)
            .cloned()
    }

    pub async fn find_attribute(&self, ruleset_id: RulesetId, title: &str) -> Option<Attribute> {
        self.data
            .read()
            .await
            .attributes
            .iter()
            .find(|a| a.ruleset_id == ruleset_id && common::titles_match(&a.title, title))
            .cloned()
    }

    /// Stored value of a character attribute, ignoring uncommitted updates.
    pub async fn attribute_value(
        &self,
        character_id: CharacterId,
        attribute_id: AttributeId,
    ) -> Option<AttributeValue> {
        self.data
            .read()
            .await
            .character_attributes
            .iter()
            .find(|ca| ca.character_id == character_id && ca.attribute_id == attribute_id)
            .map(|ca| ca.value.clone())
    }

    /// Commit a cascade's buffered effects.
    ///
    /// Every referenced inventory row is checked before anything is written;
    /// a missing row rejects the whole commit.
    pub async fn apply_pending_updates(&self, pending: &PendingUpdates) -> Result<usize, RepoError> {
        let mut data = self.data.write().await;

        for (_, update) in pending.iter() {
            if let PendingUpdate::ItemQuantity {
                inventory_item_id, ..
            } = update
            {
                if !data.inventory_items.iter().any(|i| i.id == *inventory_item_id) {
                    return Err(RepoError::not_found("InventoryItem", inventory_item_id));
                }
            }
        }

        for (key, update) in pending.iter() {
            match update {
                PendingUpdate::AttributeValue {
                    character_id,
                    attribute_id,
                    value,
                } => {
                    let existing = data
                        .character_attributes
                        .iter_mut()
                        .find(|ca| ca.character_id == *character_id && ca.attribute_id == *attribute_id);
                    match existing {
                        Some(row) => row.value = value.clone(),
                        None => {
                            let mut row =
                                CharacterAttribute::new(*character_id, *attribute_id, value.clone());
                            if let Some(id) = key
                                .strip_prefix("characterAttribute:")
                                .and_then(|raw| raw.parse().ok())
                            {
                                row.id = id;
                            }
                            data.character_attributes.push(row);
                        }
                    }
                }
                PendingUpdate::ItemQuantity {
                    inventory_item_id,
                    quantity,
                } => {
                    if let Some(row) = data
                        .inventory_items
                        .iter_mut()
                        .find(|i| i.id == *inventory_item_id)
                    {
                        row.quantity = *quantity;
                    }
                }
                PendingUpdate::InventoryAdd { items } => {
                    data.inventory_items.extend(items.iter().cloned());
                }
                PendingUpdate::InventoryRemove { ids } => {
                    data.inventory_items.retain(|item| !ids.contains(&item.id));
                }
            }
        }

        tracing::debug!(updates = pending.len(), "Applied pending updates");
        Ok(pending.len())
    }
}

#[async_trait]
impl ScriptRepo for MemoryStore {
    async fn list_scripts(
        &self,
        ruleset_id: RulesetId,
        filter: ScriptFilter,
    ) -> Result<Vec<Script>, RepoError> {
        Ok(self
            .data
            .read()
            .await
            .scripts
            .iter()
            .filter(|script| script.ruleset_id == ruleset_id && filter.matches(script))
            .cloned()
            .collect())
    }

    async fn get_script(&self, id: ScriptId) -> Result<Option<Script>, RepoError> {
        Ok(self
            .data
            .read()
            .await
            .scripts
            .iter()
            .find(|script| script.id == id)
            .cloned())
    }
}

fn in_ruleset<T: Clone>(rows: &[T], ruleset_id: RulesetId, of: impl Fn(&T) -> RulesetId) -> Vec<T> {
    rows.iter()
        .filter(|row| of(row) == ruleset_id)
        .cloned()
        .collect()
}

#[async_trait]
impl RulesetRepo for MemoryStore {
    async fn list_attributes(&self, ruleset_id: RulesetId) -> Result<Vec<Attribute>, RepoError> {
        Ok(in_ruleset(&self.data.read().await.attributes, ruleset_id, |a| a.ruleset_id))
    }

    async fn list_items(&self, ruleset_id: RulesetId) -> Result<Vec<Item>, RepoError> {
        Ok(in_ruleset(&self.data.read().await.items, ruleset_id, |i| i.ruleset_id))
    }

    async fn list_actions(&self, ruleset_id: RulesetId) -> Result<Vec<Action>, RepoError> {
        Ok(in_ruleset(&self.data.read().await.actions, ruleset_id, |a| a.ruleset_id))
    }

    async fn list_charts(&self, ruleset_id: RulesetId) -> Result<Vec<Chart>, RepoError> {
        Ok(in_ruleset(&self.data.read().await.charts, ruleset_id, |c| c.ruleset_id))
    }

    async fn get_chart(&self, id: ChartId) -> Result<Option<Chart>, RepoError> {
        Ok(self
            .data
            .read()
            .await
            .charts
            .iter()
            .find(|chart| chart.id == id)
            .cloned())
    }

    async fn get_archetype(&self, id: ArchetypeId) -> Result<Option<Archetype>, RepoError> {
        Ok(self
            .data
            .read()
            .await
            .archetypes
            .iter()
            .find(|archetype| archetype.id == id)
            .cloned())
    }
}

#[async_trait]
impl CharacterRepo for MemoryStore {
    async fn get_character(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        Ok(self.data.read().await.characters.get(&id).cloned())
    }

    async fn get_character_attribute(
        &self,
        character_id: CharacterId,
        attribute_id: AttributeId,
    ) -> Result<Option<CharacterAttribute>, RepoError> {
        Ok(self
            .data
            .read()
            .await
            .character_attributes
            .iter()
            .find(|ca| ca.character_id == character_id && ca.attribute_id == attribute_id)
            .cloned())
    }

    async fn list_character_attributes(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<CharacterAttribute>, RepoError> {
        Ok(self
            .data
            .read()
            .await
            .character_attributes
            .iter()
            .filter(|ca| ca.character_id == character_id)
            .cloned()
            .collect())
    }

    async fn list_inventory_items(
        &self,
        inventory_id: InventoryId,
    ) -> Result<Vec<InventoryItem>, RepoError> {
        Ok(self
            .data
            .read()
            .await
            .inventory_items
            .iter()
            .filter(|item| item.inventory_id == inventory_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DependencyGraphRepo for MemoryStore {
    async fn save_nodes(
        &self,
        ruleset_id: RulesetId,
        nodes: Vec<DependencyNode>,
    ) -> Result<(), RepoError> {
        self.data.write().await.graph_nodes.insert(ruleset_id, nodes);
        Ok(())
    }

    async fn load_nodes(&self, ruleset_id: RulesetId) -> Result<Vec<DependencyNode>, RepoError> {
        Ok(self
            .data
            .read()
            .await
            .graph_nodes
            .get(&ruleset_id)
            .cloned()
            .unwrap_or_default())
    }
}
