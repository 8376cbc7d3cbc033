//! A small ruleset in a [`MemoryStore`] with the script use cases wired to it.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use questbound_domain::{
    Action, Archetype, Attribute, AttributeId, AttributeType, AttributeValue, Character,
    CharacterAttribute, Item, RulesetId, Script, ScriptEntityType,
};

use crate::infrastructure::clock::{FixedClock, FixedRandom};
use crate::infrastructure::dice::FormulaDiceRoller;
use crate::infrastructure::memory::{MemoryStore, StoreFixture};
use crate::infrastructure::ports::{CharacterRepo, RandomPort};
use crate::qbscript::PendingUpdates;
use crate::reactive::{ExecutionLimits, ExecutionTracker};
use crate::stores::DependencyGraphStore;

use super::{RuntimeStateLoader, ScriptUseCases};

/// Aria (the owner) and a Goblin (a target) sharing one ruleset with
/// Hit Points, Level, Proficiency and Armor Class.
pub struct World {
    pub ruleset_id: RulesetId,
    pub aria: Character,
    pub goblin: Character,
    pub store: Arc<MemoryStore>,
    tracker: Arc<ExecutionTracker>,
    loader: Arc<RuntimeStateLoader>,
    use_cases: ScriptUseCases,
}

impl World {
    pub async fn new() -> Self {
        let ruleset_id = RulesetId::new();
        let aria = Character::new(ruleset_id, "Aria");
        let goblin = Character::new(ruleset_id, "Goblin");

        let number = |title: &str| Attribute::new(ruleset_id, title, AttributeType::Number);
        let attributes = vec![
            number("Hit Points"),
            number("Level"),
            number("Proficiency"),
            number("Armor Class"),
        ];
        let values = [
            (&aria, "Hit Points", 10.0),
            (&aria, "Level", 1.0),
            (&aria, "Proficiency", 2.0),
            (&aria, "Armor Class", 10.0),
            (&goblin, "Hit Points", 7.0),
        ];
        let character_attributes = values
            .iter()
            .map(|(character, title, value)| {
                let attribute = attributes.iter().find(|a| a.title == *title).unwrap();
                CharacterAttribute::new(character.id, attribute.id, AttributeValue::Number(*value))
            })
            .collect();

        let store = Arc::new(
            MemoryStore::from_fixture(StoreFixture {
                attributes,
                characters: vec![aria.clone(), goblin.clone()],
                character_attributes,
                ..StoreFixture::default()
            })
            .unwrap(),
        );

        let random: Arc<dyn RandomPort> = Arc::new(FixedRandom(3));
        let loader = Arc::new(RuntimeStateLoader::new(
            store.clone(),
            store.clone(),
            store.clone(),
            random.clone(),
            Arc::new(FormulaDiceRoller::new(random)),
        ));
        let tracker = Arc::new(ExecutionTracker::new(Arc::new(FixedClock(Utc::now()))));
        let use_cases = ScriptUseCases::wire(
            store.clone(),
            store.clone(),
            store.clone(),
            loader.clone(),
            tracker.clone(),
            Arc::new(DependencyGraphStore::new()),
            ExecutionLimits::default(),
            false,
        );

        Self {
            ruleset_id,
            aria,
            goblin,
            store,
            tracker,
            loader,
            use_cases,
        }
    }

    pub fn use_cases(&self) -> &ScriptUseCases {
        &self.use_cases
    }

    pub fn loader(&self) -> Arc<RuntimeStateLoader> {
        self.loader.clone()
    }

    pub fn tracker(&self) -> Arc<ExecutionTracker> {
        self.tracker.clone()
    }

    pub async fn attribute(&self, title: &str) -> AttributeId {
        self.store
            .find_attribute(self.ruleset_id, title)
            .await
            .unwrap()
            .id
    }

    pub async fn add_global(&self, name: &str, source: &str) -> Script {
        let script = Script::global(self.ruleset_id, name, source);
        self.store.insert_script(script.clone()).await;
        script
    }

    pub async fn add_attribute_script(&self, title: &str, source: &str) -> Script {
        let attribute_id = self.attribute(title).await;
        self.add_entity_script(ScriptEntityType::Attribute, attribute_id.to_uuid(), title, source)
            .await
    }

    pub async fn add_entity_script(
        &self,
        entity_type: ScriptEntityType,
        entity_id: Uuid,
        name: &str,
        source: &str,
    ) -> Script {
        let script = Script::for_entity(self.ruleset_id, name, entity_type, entity_id, source);
        self.store.insert_script(script.clone()).await;
        script
    }

    pub async fn add_item(&self, item: Item) {
        self.store.insert_item(item).await;
    }

    pub async fn add_action(&self, action: Action) {
        self.store.insert_action(action).await;
    }

    pub async fn add_archetype(&self, archetype: Archetype) {
        self.store.insert_archetype(archetype).await;
    }

    fn character(&self, name: &str) -> &Character {
        match name {
            "Aria" => &self.aria,
            "Goblin" => &self.goblin,
            other => panic!("no character named {other}"),
        }
    }

    pub async fn value(&self, name: &str, title: &str) -> Option<AttributeValue> {
        let attribute_id = self.attribute(title).await;
        self.store
            .attribute_value(self.character(name).id, attribute_id)
            .await
    }

    /// Commit a value directly, as a host would before propagating.
    pub async fn set_value(&self, name: &str, title: &str, value: f64) {
        let character_id = self.character(name).id;
        let attribute_id = self.attribute(title).await;
        let mut row = self
            .store
            .get_character_attribute(character_id, attribute_id)
            .await
            .unwrap()
            .unwrap();
        row.value = AttributeValue::Number(value);
        let mut pending = PendingUpdates::new();
        pending.set_attribute(&row);
        self.store.apply_pending_updates(&pending).await.unwrap();
    }
}
