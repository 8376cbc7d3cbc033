//! In-memory state one cascade runs against.
//!
//! Everything a script can read is loaded before the cascade starts. Writes
//! go to the character mirrors (so later reads see them) and to
//! [`PendingUpdates`] (so the caller can commit them).

use std::collections::HashMap;
use std::sync::Arc;

use questbound_domain::common::normalize_title;
use questbound_domain::{
    Action, ActionId, Attribute, AttributeId, Character, CharacterAttribute, CharacterId, Chart,
    ChartId, InventoryItem, InventoryItemId, Item, ItemId, RulesetId, Script, ScriptEntityType,
    ScriptId,
};

use super::pending::PendingUpdates;
use crate::infrastructure::ports::{DiceRollerPort, RandomPort};
use crate::qbscript::error::EvaluationError;

/// Read-only ruleset definitions shared by every cascade on the ruleset.
#[derive(Debug, Clone, Default)]
pub struct RulesetCache {
    pub ruleset_id: RulesetId,
    attributes: Vec<Attribute>,
    items: Vec<Item>,
    actions: Vec<Action>,
    charts: Vec<Chart>,
    scripts: Vec<Script>,
}

impl RulesetCache {
    pub fn new(ruleset_id: RulesetId) -> Self {
        Self {
            ruleset_id,
            ..Self::default()
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_charts(mut self, charts: Vec<Chart>) -> Self {
        self.charts = charts;
        self
    }

    pub fn with_scripts(mut self, scripts: Vec<Script>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }

    pub fn attribute_by_title(&self, title: &str) -> Option<&Attribute> {
        let wanted = normalize_title(title);
        self.attributes
            .iter()
            .find(|a| normalize_title(&a.title) == wanted)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn item_by_title(&self, title: &str) -> Option<&Item> {
        let wanted = normalize_title(title);
        self.items.iter().find(|i| normalize_title(&i.title) == wanted)
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn action_by_title(&self, title: &str) -> Option<&Action> {
        let wanted = normalize_title(title);
        self.actions
            .iter()
            .find(|a| normalize_title(&a.title) == wanted)
    }

    pub fn chart(&self, id: ChartId) -> Option<&Chart> {
        self.charts.iter().find(|c| c.id == id)
    }

    pub fn chart_by_title(&self, title: &str) -> Option<&Chart> {
        let wanted = normalize_title(title);
        self.charts.iter().find(|c| normalize_title(&c.title) == wanted)
    }

    pub fn script(&self, id: ScriptId) -> Option<&Script> {
        self.scripts.iter().find(|s| s.id == id)
    }

    /// The enabled script attached to an entity.
    pub fn script_for(&self, entity_type: ScriptEntityType, entity_id: uuid::Uuid) -> Option<&Script> {
        self.scripts
            .iter()
            .find(|s| s.enabled && s.is_attached_to(entity_type, entity_id))
    }
}

/// One character's mutable mirror.
#[derive(Debug, Clone)]
pub struct CharacterSheet {
    pub character: Character,
    pub attributes: HashMap<AttributeId, CharacterAttribute>,
    pub inventory: Vec<InventoryItem>,
}

impl CharacterSheet {
    pub fn new(character: Character) -> Self {
        Self {
            character,
            attributes: HashMap::new(),
            inventory: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = CharacterAttribute>) -> Self {
        self.attributes = attributes
            .into_iter()
            .map(|a| (a.attribute_id, a))
            .collect();
        self
    }

    pub fn with_inventory(mut self, inventory: Vec<InventoryItem>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn inventory_item(&self, id: InventoryItemId) -> Option<&InventoryItem> {
        self.inventory.iter().find(|i| i.id == id)
    }
}

/// Which entities a script run is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptBindings {
    pub owner: CharacterId,
    pub target: Option<CharacterId>,
    /// Set for attribute scripts; `Self` resolves to this attribute of the owner.
    pub self_attribute: Option<AttributeId>,
}

impl ScriptBindings {
    pub fn new(owner: CharacterId) -> Self {
        Self {
            owner,
            target: None,
            self_attribute: None,
        }
    }

    pub fn with_target(mut self, target: Option<CharacterId>) -> Self {
        self.target = target;
        self
    }

    /// Bind `Self` when the script belongs to an attribute.
    pub fn for_script(owner: CharacterId, target: Option<CharacterId>, script: &Script) -> Self {
        let self_attribute = match (script.entity_type, script.entity_id) {
            (ScriptEntityType::Attribute, Some(id)) => Some(AttributeId::from_uuid(id)),
            _ => None,
        };
        Self {
            owner,
            target,
            self_attribute,
        }
    }
}

/// Snapshot taken before a script runs so a failure can be undone.
#[derive(Debug, Clone)]
pub struct StateCheckpoint {
    characters: HashMap<CharacterId, CharacterSheet>,
    pending: PendingUpdates,
    announcements: usize,
    changed: usize,
}

pub struct RuntimeState {
    ruleset: Arc<RulesetCache>,
    characters: HashMap<CharacterId, CharacterSheet>,
    pub(crate) pending: PendingUpdates,
    announcements: Vec<String>,
    logs: Vec<String>,
    changed: Vec<(CharacterId, AttributeId)>,
    pub(crate) random: Arc<dyn RandomPort>,
    pub(crate) dice: Arc<dyn DiceRollerPort>,
    pub(crate) max_action_depth: usize,
}

pub const DEFAULT_MAX_ACTION_DEPTH: usize = 8;

impl RuntimeState {
    pub fn new(
        ruleset: Arc<RulesetCache>,
        random: Arc<dyn RandomPort>,
        dice: Arc<dyn DiceRollerPort>,
    ) -> Self {
        Self {
            ruleset,
            characters: HashMap::new(),
            pending: PendingUpdates::new(),
            announcements: Vec::new(),
            logs: Vec::new(),
            changed: Vec::new(),
            random,
            dice,
            max_action_depth: DEFAULT_MAX_ACTION_DEPTH,
        }
    }

    pub fn with_max_action_depth(mut self, depth: usize) -> Self {
        self.max_action_depth = depth;
        self
    }

    pub fn insert_character(&mut self, sheet: CharacterSheet) {
        self.characters.insert(sheet.character.id, sheet);
    }

    pub fn ruleset(&self) -> &RulesetCache {
        &self.ruleset
    }

    pub fn ruleset_handle(&self) -> Arc<RulesetCache> {
        Arc::clone(&self.ruleset)
    }

    pub fn character(&self, id: CharacterId) -> Option<&CharacterSheet> {
        self.characters.get(&id)
    }

    pub fn pending_updates(&self) -> &PendingUpdates {
        &self.pending
    }

    pub fn announcements(&self) -> &[String] {
        &self.announcements
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Consume the state, keeping only what the caller commits or reports.
    pub fn into_effects(self) -> (PendingUpdates, Vec<String>, Vec<String>) {
        (self.pending, self.announcements, self.logs)
    }

    pub fn announce(&mut self, message: String) {
        tracing::info!(target: "qbscript", announcement = %message, "announce");
        self.announcements.push(message);
    }

    pub fn log(&mut self, line: String) {
        tracing::info!(target: "qbscript", "{}", line);
        self.logs.push(line);
    }

    /// Owner attributes whose values changed since the last call.
    pub fn take_changed(&mut self) -> Vec<(CharacterId, AttributeId)> {
        std::mem::take(&mut self.changed)
    }

    pub fn checkpoint(&self) -> StateCheckpoint {
        StateCheckpoint {
            characters: self.characters.clone(),
            pending: self.pending.clone(),
            announcements: self.announcements.len(),
            changed: self.changed.len(),
        }
    }

    /// Undo every mirror write and buffered update since the checkpoint.
    /// Logs are kept so authors can see what ran before the failure.
    pub fn restore(&mut self, checkpoint: StateCheckpoint) {
        self.characters = checkpoint.characters;
        self.pending = checkpoint.pending;
        self.announcements.truncate(checkpoint.announcements);
        self.changed.truncate(checkpoint.changed);
    }

    // ------------------------------------------------------------------
    // Lookups used by the accessors
    // ------------------------------------------------------------------

    pub(crate) fn sheet(&self, id: CharacterId) -> Result<&CharacterSheet, EvaluationError> {
        self.characters
            .get(&id)
            .ok_or_else(|| EvaluationError::new(format!("Character {} is not loaded", id)))
    }

    pub(crate) fn sheet_mut(&mut self, id: CharacterId) -> Result<&mut CharacterSheet, EvaluationError> {
        self.characters
            .get_mut(&id)
            .ok_or_else(|| EvaluationError::new(format!("Character {} is not loaded", id)))
    }

    pub(crate) fn attribute_definition(&self, id: AttributeId) -> Result<&Attribute, EvaluationError> {
        self.ruleset
            .attribute(id)
            .ok_or_else(|| EvaluationError::new(format!("Attribute {} not found", id)))
    }

    /// Resolve an attribute title for a character, creating the character's
    /// value from the definition's default when it has none yet.
    pub(crate) fn resolve_attribute(
        &mut self,
        character_id: CharacterId,
        title: &str,
    ) -> Result<AttributeId, EvaluationError> {
        let attribute = self
            .ruleset
            .attribute_by_title(title)
            .cloned()
            .ok_or_else(|| EvaluationError::new(format!("Attribute '{}' not found", title)))?;
        self.ensure_character_attribute(character_id, &attribute)?;
        Ok(attribute.id)
    }

    pub(crate) fn ensure_character_attribute(
        &mut self,
        character_id: CharacterId,
        attribute: &Attribute,
    ) -> Result<(), EvaluationError> {
        let sheet = self.sheet_mut(character_id)?;
        sheet
            .attributes
            .entry(attribute.id)
            .or_insert_with(|| CharacterAttribute::from_definition(character_id, attribute));
        Ok(())
    }

    pub(crate) fn character_attribute(
        &self,
        character_id: CharacterId,
        attribute_id: AttributeId,
    ) -> Result<&CharacterAttribute, EvaluationError> {
        self.sheet(character_id)?
            .attributes
            .get(&attribute_id)
            .ok_or_else(|| EvaluationError::new(format!("Attribute {} not found", attribute_id)))
    }

    /// Write an attribute value through to the mirror and the pending map.
    pub(crate) fn write_attribute(
        &mut self,
        character_id: CharacterId,
        attribute_id: AttributeId,
        value: questbound_domain::AttributeValue,
    ) -> Result<(), EvaluationError> {
        let sheet = self.sheet_mut(character_id)?;
        let attribute = sheet
            .attributes
            .get_mut(&attribute_id)
            .ok_or_else(|| EvaluationError::new(format!("Attribute {} not found", attribute_id)))?;
        let changed = attribute.value != value;
        attribute.value = value;
        let snapshot = attribute.clone();

        self.pending.set_attribute(&snapshot);
        if changed && !self.changed.contains(&(character_id, attribute_id)) {
            self.changed.push((character_id, attribute_id));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders shared by accessor and evaluator tests.

    use super::*;
    use crate::infrastructure::clock::FixedRandom;
    use crate::infrastructure::dice::FormulaDiceRoller;
    use questbound_domain::{AttributeType, AttributeValue};

    pub struct StateBuilder {
        pub ruleset: RulesetCache,
        pub owner: Character,
        pub owner_attributes: Vec<CharacterAttribute>,
        pub owner_inventory: Vec<InventoryItem>,
        pub target: Option<Character>,
        pub random: i32,
    }

    impl StateBuilder {
        pub fn new() -> Self {
            let ruleset_id = RulesetId::new();
            Self {
                ruleset: RulesetCache::new(ruleset_id),
                owner: Character::new(ruleset_id, "Aria"),
                owner_attributes: Vec::new(),
                owner_inventory: Vec::new(),
                target: None,
                random: 1,
            }
        }

        pub fn ruleset_id(&self) -> RulesetId {
            self.ruleset.ruleset_id
        }

        /// Add an attribute definition and give the owner a value for it.
        pub fn attribute(
            mut self,
            title: &str,
            attribute_type: AttributeType,
            value: AttributeValue,
            configure: impl FnOnce(Attribute) -> Attribute,
        ) -> Self {
            let attribute = configure(Attribute::new(self.ruleset_id(), title, attribute_type));
            self.owner_attributes
                .push(CharacterAttribute::new(self.owner.id, attribute.id, value));
            let mut attributes = self.ruleset.attributes().to_vec();
            attributes.push(attribute);
            self.ruleset = self.ruleset.with_attributes(attributes);
            self
        }

        pub fn number(self, title: &str, value: f64) -> Self {
            self.attribute(title, AttributeType::Number, AttributeValue::Number(value), |a| a)
        }

        pub fn items(mut self, items: Vec<Item>) -> Self {
            self.ruleset = self.ruleset.with_items(items);
            self
        }

        pub fn inventory(mut self, inventory: Vec<InventoryItem>) -> Self {
            self.owner_inventory = inventory;
            self
        }

        pub fn charts(mut self, charts: Vec<Chart>) -> Self {
            self.ruleset = self.ruleset.with_charts(charts);
            self
        }

        pub fn actions(mut self, actions: Vec<Action>) -> Self {
            self.ruleset = self.ruleset.with_actions(actions);
            self
        }

        pub fn scripts(mut self, scripts: Vec<Script>) -> Self {
            self.ruleset = self.ruleset.with_scripts(scripts);
            self
        }

        pub fn with_target(mut self) -> Self {
            self.target = Some(Character::new(self.ruleset_id(), "Goblin"));
            self
        }

        pub fn random(mut self, value: i32) -> Self {
            self.random = value;
            self
        }

        pub fn build(self) -> RuntimeState {
            let random: Arc<dyn RandomPort> = Arc::new(FixedRandom(self.random));
            let dice = Arc::new(FormulaDiceRoller::new(random.clone()));
            let mut state = RuntimeState::new(Arc::new(self.ruleset), random, dice);
            state.insert_character(
                CharacterSheet::new(self.owner)
                    .with_attributes(self.owner_attributes)
                    .with_inventory(self.owner_inventory),
            );
            if let Some(target) = self.target {
                state.insert_character(CharacterSheet::new(target));
            }
            state
        }
    }

    /// First character inserted by [`StateBuilder`] with the given name.
    pub fn character_named(state: &RuntimeState, name: &str) -> CharacterId {
        state
            .characters
            .values()
            .find(|s| s.character.name == name)
            .map(|s| s.character.id)
            .unwrap()
    }

    pub fn attribute_id(state: &RuntimeState, title: &str) -> AttributeId {
        state.ruleset().attribute_by_title(title).unwrap().id
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use questbound_domain::AttributeValue;

    #[test]
    fn writes_record_pending_and_changed() {
        let mut state = StateBuilder::new().number("HP", 10.0).build();
        let owner = character_named(&state, "Aria");
        let hp = attribute_id(&state, "HP");

        state
            .write_attribute(owner, hp, AttributeValue::Number(12.0))
            .unwrap();
        assert_eq!(state.take_changed(), vec![(owner, hp)]);
        assert_eq!(state.pending_updates().len(), 1);

        // Same value again: buffered but not a change.
        state
            .write_attribute(owner, hp, AttributeValue::Number(12.0))
            .unwrap();
        assert!(state.take_changed().is_empty());
    }

    #[test]
    fn restore_undoes_mirror_and_pending() {
        let mut state = StateBuilder::new().number("HP", 10.0).build();
        let owner = character_named(&state, "Aria");
        let hp = attribute_id(&state, "HP");

        let checkpoint = state.checkpoint();
        state
            .write_attribute(owner, hp, AttributeValue::Number(1.0))
            .unwrap();
        state.announce("ouch".to_string());
        state.log("took damage".to_string());
        state.restore(checkpoint);

        assert_eq!(
            state.character_attribute(owner, hp).unwrap().value,
            AttributeValue::Number(10.0)
        );
        assert!(state.pending_updates().is_empty());
        assert!(state.announcements().is_empty());
        assert_eq!(state.logs().len(), 1);
        assert!(state.take_changed().is_empty());
    }

    #[test]
    fn resolving_attribute_without_value_uses_default() {
        let mut state = StateBuilder::new().build();
        let owner = character_named(&state, "Aria");
        let ruleset_id = state.ruleset().ruleset_id;
        let speed = Attribute::new(ruleset_id, "Speed", questbound_domain::AttributeType::Number)
            .with_default(AttributeValue::Number(30.0));
        state.ruleset = Arc::new(RulesetCache::new(ruleset_id).with_attributes(vec![speed]));

        let id = state.resolve_attribute(owner, " speed ").unwrap();
        assert_eq!(
            state.character_attribute(owner, id).unwrap().value,
            AttributeValue::Number(30.0)
        );
    }
}
