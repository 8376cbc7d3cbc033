//! Execute script use case.
//!
//! Runs one script for one character and returns its buffered effects. The
//! store is not written; committing `pending_updates` is the caller's job.

use std::sync::Arc;

use serde::Serialize;

use questbound_domain::{AttributeId, CharacterId, ScriptEvent, ScriptId};

use crate::infrastructure::ports::ScriptRepo;
use crate::qbscript::{
    run_script, PendingUpdates, RuntimeState, ScriptBindings, ScriptError, ScriptErrorReport, Value,
};

use super::error::ScriptUseCaseError;
use super::loader::RuntimeStateLoader;

/// Outcome of one script run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptExecutionResult {
    /// The script that ran, or `None` when the entity had no script.
    pub script_id: Option<ScriptId>,
    pub return_value: Option<String>,
    pub pending_updates: PendingUpdates,
    pub announcements: Vec<String>,
    pub logs: Vec<String>,
    /// Owner attributes whose value changed; feed these to propagation after committing.
    pub changed_attributes: Vec<AttributeId>,
    pub error: Option<ScriptErrorReport>,
}

impl ScriptExecutionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub(super) fn from_run(
        script_id: ScriptId,
        owner: CharacterId,
        mut state: RuntimeState,
        result: Result<Value, ScriptError>,
    ) -> Self {
        let mut changed_attributes = Vec::new();
        for (character_id, attribute_id) in state.take_changed() {
            if character_id == owner && !changed_attributes.contains(&attribute_id) {
                changed_attributes.push(attribute_id);
            }
        }
        let (pending_updates, announcements, logs) = state.into_effects();
        let (return_value, error) = match result {
            Ok(Value::Null) => (None, None),
            Ok(value) => (Some(value.to_string()), None),
            Err(e) => (None, Some(ScriptErrorReport::from(&e))),
        };
        Self {
            script_id: Some(script_id),
            return_value,
            pending_updates,
            announcements,
            logs,
            changed_attributes,
            error,
        }
    }
}

pub struct ExecuteScript {
    scripts: Arc<dyn ScriptRepo>,
    loader: Arc<RuntimeStateLoader>,
}

impl ExecuteScript {
    pub fn new(scripts: Arc<dyn ScriptRepo>, loader: Arc<RuntimeStateLoader>) -> Self {
        Self { scripts, loader }
    }

    /// Run `script_id` with `character_id` as `Owner`.
    ///
    /// With a `trigger`, the matching event handler runs after the top level.
    /// A failing script is reported in [`ScriptExecutionResult::error`] with
    /// its updates discarded; only missing records are returned as `Err`.
    pub async fn execute(
        &self,
        character_id: CharacterId,
        script_id: ScriptId,
        trigger: Option<ScriptEvent>,
        target: Option<CharacterId>,
    ) -> Result<ScriptExecutionResult, ScriptUseCaseError> {
        let script = self
            .scripts
            .get_script(script_id)
            .await?
            .ok_or(ScriptUseCaseError::ScriptNotFound(script_id))?;

        let mut state = self.loader.load(character_id, target).await?;
        if state.ruleset().ruleset_id != script.ruleset_id {
            return Err(ScriptUseCaseError::RulesetMismatch {
                character_id,
                ruleset_id: script.ruleset_id,
            });
        }

        let bindings = ScriptBindings::for_script(character_id, target, &script);
        let result = run_script(&mut state, &script, bindings, trigger).await;
        Ok(ScriptExecutionResult::from_run(
            script.id,
            character_id,
            state,
            result,
        ))
    }
}
