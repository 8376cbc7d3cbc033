//! Loads everything one cascade may read into a [`RuntimeState`].

use std::sync::Arc;

use questbound_domain::{CharacterId, RulesetId};

use crate::infrastructure::ports::{
    CharacterRepo, DiceRollerPort, RandomPort, RulesetRepo, ScriptFilter, ScriptRepo,
};
use crate::qbscript::accessors::DEFAULT_MAX_ACTION_DEPTH;
use crate::qbscript::{CharacterSheet, RulesetCache, RuntimeState};

use super::error::ScriptUseCaseError;

/// Builds the state a cascade runs against.
///
/// Scripts never touch a repository while running, so every definition and
/// both character sheets are fetched up front.
pub struct RuntimeStateLoader {
    scripts: Arc<dyn ScriptRepo>,
    ruleset: Arc<dyn RulesetRepo>,
    characters: Arc<dyn CharacterRepo>,
    random: Arc<dyn RandomPort>,
    dice: Arc<dyn DiceRollerPort>,
    max_action_depth: usize,
}

impl RuntimeStateLoader {
    pub fn new(
        scripts: Arc<dyn ScriptRepo>,
        ruleset: Arc<dyn RulesetRepo>,
        characters: Arc<dyn CharacterRepo>,
        random: Arc<dyn RandomPort>,
        dice: Arc<dyn DiceRollerPort>,
    ) -> Self {
        Self {
            scripts,
            ruleset,
            characters,
            random,
            dice,
            max_action_depth: DEFAULT_MAX_ACTION_DEPTH,
        }
    }

    pub fn with_max_action_depth(mut self, depth: usize) -> Self {
        self.max_action_depth = depth;
        self
    }

    pub async fn load_ruleset(&self, ruleset_id: RulesetId) -> Result<RulesetCache, ScriptUseCaseError> {
        let (attributes, items, actions, charts, scripts) = tokio::try_join!(
            self.ruleset.list_attributes(ruleset_id),
            self.ruleset.list_items(ruleset_id),
            self.ruleset.list_actions(ruleset_id),
            self.ruleset.list_charts(ruleset_id),
            self.scripts.list_scripts(ruleset_id, ScriptFilter::enabled()),
        )?;
        tracing::debug!(
            ruleset_id = %ruleset_id,
            attributes = attributes.len(),
            scripts = scripts.len(),
            "Loaded ruleset definitions"
        );
        Ok(RulesetCache::new(ruleset_id)
            .with_attributes(attributes)
            .with_items(items)
            .with_actions(actions)
            .with_charts(charts)
            .with_scripts(scripts))
    }

    pub async fn load_sheet(&self, character_id: CharacterId) -> Result<CharacterSheet, ScriptUseCaseError> {
        let character = self
            .characters
            .get_character(character_id)
            .await?
            .ok_or(ScriptUseCaseError::CharacterNotFound(character_id))?;
        let (attributes, inventory) = tokio::try_join!(
            self.characters.list_character_attributes(character_id),
            self.characters.list_inventory_items(character.inventory_id),
        )?;
        Ok(CharacterSheet::new(character)
            .with_attributes(attributes)
            .with_inventory(inventory))
    }

    /// State for a run owned by `owner`, with `target` loaded when given.
    /// The ruleset is the owner's.
    pub async fn load(
        &self,
        owner: CharacterId,
        target: Option<CharacterId>,
    ) -> Result<RuntimeState, ScriptUseCaseError> {
        let owner_sheet = self.load_sheet(owner).await?;
        let ruleset_id = owner_sheet.character.ruleset_id;
        let ruleset = self.load_ruleset(ruleset_id).await?;

        let mut state = RuntimeState::new(
            Arc::new(ruleset),
            Arc::clone(&self.random),
            Arc::clone(&self.dice),
        )
        .with_max_action_depth(self.max_action_depth);
        state.insert_character(owner_sheet);

        if let Some(target_id) = target.filter(|id| *id != owner) {
            let target_sheet = self.load_sheet(target_id).await?;
            if target_sheet.character.ruleset_id != ruleset_id {
                return Err(ScriptUseCaseError::RulesetMismatch {
                    character_id: target_id,
                    ruleset_id,
                });
            }
            state.insert_character(target_sheet);
        }
        Ok(state)
    }
}
