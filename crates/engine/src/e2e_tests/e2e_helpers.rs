//! Shared setup for end-to-end tests.

use std::sync::Arc;

use questbound_domain::{AttributeId, AttributeValue, CharacterId, RulesetId};

use crate::infrastructure::memory::MemoryStore;
use crate::infrastructure::ports::{CharacterRepo, RepoError};
use crate::infrastructure::settings::RuntimeSettings;
use crate::qbscript::PendingUpdates;
use crate::App;

/// The demo ruleset shipped for the CLI.
pub const RANGER_FIXTURE: &str = include_str!("../../../../demos/ranger.json");

pub struct E2ETestContext {
    pub app: App,
    pub store: Arc<MemoryStore>,
    pub ruleset_id: RulesetId,
}

impl E2ETestContext {
    pub async fn setup() -> Result<Self, RepoError> {
        Self::with_settings(RuntimeSettings {
            seed: Some(7),
            ..RuntimeSettings::default()
        })
        .await
    }

    pub async fn with_settings(settings: RuntimeSettings) -> Result<Self, RepoError> {
        let store = Arc::new(MemoryStore::from_json(RANGER_FIXTURE)?);
        let ruleset_id = store
            .ruleset_ids()
            .await
            .first()
            .copied()
            .ok_or_else(|| RepoError::not_found("Ruleset", "ranger"))?;
        Ok(Self {
            app: App::in_memory(store.clone(), settings),
            store,
            ruleset_id,
        })
    }

    pub async fn character(&self, name: &str) -> CharacterId {
        self.store
            .find_character(name)
            .await
            .unwrap_or_else(|| panic!("character {name} should exist"))
            .id
    }

    pub async fn attribute(&self, title: &str) -> AttributeId {
        self.store
            .find_attribute(self.ruleset_id, title)
            .await
            .unwrap_or_else(|| panic!("attribute {title} should exist"))
            .id
    }

    pub async fn value(&self, character: &str, title: &str) -> AttributeValue {
        let character_id = self.character(character).await;
        let attribute_id = self.attribute(title).await;
        self.store
            .attribute_value(character_id, attribute_id)
            .await
            .unwrap_or_else(|| panic!("{character} should have {title}"))
    }

    pub async fn number(&self, character: &str, title: &str) -> f64 {
        match self.value(character, title).await {
            AttributeValue::Number(n) => n,
            other => panic!("{title} is not a number: {other:?}"),
        }
    }

    /// Write a value the way a player edit would, before propagating it.
    pub async fn set(&self, character: &str, title: &str, value: AttributeValue) -> AttributeId {
        let character_id = self.character(character).await;
        let attribute_id = self.attribute(title).await;
        let mut row = self
            .store
            .get_character_attribute(character_id, attribute_id)
            .await
            .expect("store read should succeed")
            .expect("attribute row should exist");
        row.value = value;
        let mut pending = PendingUpdates::new();
        pending.set_attribute(&row);
        self.commit(&pending).await;
        attribute_id
    }

    pub async fn commit(&self, pending: &PendingUpdates) {
        self.store
            .apply_pending_updates(pending)
            .await
            .expect("commit should succeed");
    }
}
