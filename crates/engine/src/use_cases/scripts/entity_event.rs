//! Entity event use case.
//!
//! Delivers lifecycle events to the script attached to an archetype, item or
//! action: `on_add`/`on_remove` when an archetype is granted or revoked,
//! `on_equip`/`on_unequip`/`on_consume` for items, `on_activate`/`on_deactivate`
//! for actions. An entity without a script is not an error.

use std::sync::Arc;

use uuid::Uuid;

use questbound_domain::{ActionId, ArchetypeId, CharacterId, ItemId, ScriptEntityType, ScriptEvent};

use crate::infrastructure::ports::RulesetRepo;
use crate::qbscript::{run_script, RuntimeState, ScriptBindings};

use super::error::ScriptUseCaseError;
use super::execute_script::ScriptExecutionResult;
use super::loader::RuntimeStateLoader;

pub struct ExecuteEntityEvent {
    ruleset: Arc<dyn RulesetRepo>,
    loader: Arc<RuntimeStateLoader>,
}

impl ExecuteEntityEvent {
    pub fn new(ruleset: Arc<dyn RulesetRepo>, loader: Arc<RuntimeStateLoader>) -> Self {
        Self { ruleset, loader }
    }

    pub async fn archetype_event(
        &self,
        archetype_id: ArchetypeId,
        character_id: CharacterId,
        event: ScriptEvent,
    ) -> Result<ScriptExecutionResult, ScriptUseCaseError> {
        ensure_event(event, ScriptEntityType::Archetype, event.is_archetype_event())?;
        let archetype = self
            .ruleset
            .get_archetype(archetype_id)
            .await?
            .ok_or(ScriptUseCaseError::ArchetypeNotFound(archetype_id))?;

        let state = self.loader.load(character_id, None).await?;
        if archetype.ruleset_id != state.ruleset().ruleset_id {
            return Err(ScriptUseCaseError::RulesetMismatch {
                character_id,
                ruleset_id: archetype.ruleset_id,
            });
        }
        dispatch(
            state,
            ScriptEntityType::Archetype,
            archetype_id.to_uuid(),
            ScriptBindings::new(character_id),
            event,
        )
        .await
    }

    pub async fn item_event(
        &self,
        item_id: ItemId,
        character_id: CharacterId,
        event: ScriptEvent,
    ) -> Result<ScriptExecutionResult, ScriptUseCaseError> {
        ensure_event(event, ScriptEntityType::Item, event.is_item_event())?;
        let state = self.loader.load(character_id, None).await?;
        if state.ruleset().item(item_id).is_none() {
            return Err(ScriptUseCaseError::ItemNotFound(item_id));
        }
        dispatch(
            state,
            ScriptEntityType::Item,
            item_id.to_uuid(),
            ScriptBindings::new(character_id),
            event,
        )
        .await
    }

    pub async fn action_event(
        &self,
        action_id: ActionId,
        character_id: CharacterId,
        event: ScriptEvent,
        target: Option<CharacterId>,
    ) -> Result<ScriptExecutionResult, ScriptUseCaseError> {
        ensure_event(event, ScriptEntityType::Action, event.is_action_event())?;
        let state = self.loader.load(character_id, target).await?;
        if state.ruleset().action(action_id).is_none() {
            return Err(ScriptUseCaseError::ActionNotFound(action_id));
        }
        dispatch(
            state,
            ScriptEntityType::Action,
            action_id.to_uuid(),
            ScriptBindings::new(character_id).with_target(target),
            event,
        )
        .await
    }
}

fn ensure_event(
    event: ScriptEvent,
    entity_type: ScriptEntityType,
    allowed: bool,
) -> Result<(), ScriptUseCaseError> {
    if allowed {
        Ok(())
    } else {
        Err(ScriptUseCaseError::UnsupportedEvent { event, entity_type })
    }
}

async fn dispatch(
    mut state: RuntimeState,
    entity_type: ScriptEntityType,
    entity_id: Uuid,
    bindings: ScriptBindings,
    event: ScriptEvent,
) -> Result<ScriptExecutionResult, ScriptUseCaseError> {
    let Some(script) = state.ruleset().script_for(entity_type, entity_id).cloned() else {
        tracing::debug!(entity_type = %entity_type, entity_id = %entity_id, event = %event, "No script attached, event ignored");
        return Ok(ScriptExecutionResult::default());
    };

    tracing::debug!(script_id = %script.id, event = %event, "Dispatching entity event");
    let result = run_script(&mut state, &script, bindings, Some(event)).await;
    Ok(ScriptExecutionResult::from_run(
        script.id,
        bindings.owner,
        state,
        result,
    ))
}
