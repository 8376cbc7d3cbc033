//! Propagate attribute change use case.
//!
//! Entry point of reactivity: an attribute of a character changed (already
//! committed by the caller), so every script subscribed to it runs, and so on
//! breadth-first until nothing else changes or a limit is hit.

use std::sync::Arc;

use serde::Serialize;

use questbound_domain::{AttributeId, CharacterId};

use crate::qbscript::PendingUpdates;
use crate::reactive::{
    run_cascade, CascadeOutcome, CascadeRequest, ExecutionLimits, ExecutionTracker,
};

use super::build_graph::BuildDependencyGraph;
use super::error::ScriptUseCaseError;
use super::loader::RuntimeStateLoader;

/// A cascade plus the effects it buffered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationResult {
    #[serde(flatten)]
    pub cascade: CascadeOutcome,
    pub pending_updates: PendingUpdates,
    pub announcements: Vec<String>,
    pub logs: Vec<String>,
}

pub struct PropagateAttributeChange {
    graphs: Arc<BuildDependencyGraph>,
    loader: Arc<RuntimeStateLoader>,
    tracker: Arc<ExecutionTracker>,
    limits: ExecutionLimits,
    halt_on_script_error: bool,
}

impl PropagateAttributeChange {
    pub fn new(
        graphs: Arc<BuildDependencyGraph>,
        loader: Arc<RuntimeStateLoader>,
        tracker: Arc<ExecutionTracker>,
        limits: ExecutionLimits,
    ) -> Self {
        Self {
            graphs,
            loader,
            tracker,
            limits,
            halt_on_script_error: false,
        }
    }

    pub fn halting_on_script_error(mut self, halt: bool) -> Self {
        self.halt_on_script_error = halt;
        self
    }

    pub async fn execute(
        &self,
        character_id: CharacterId,
        attribute_id: AttributeId,
        target: Option<CharacterId>,
    ) -> Result<PropagationResult, ScriptUseCaseError> {
        let mut state = self.loader.load(character_id, target).await?;
        let ruleset_id = state.ruleset().ruleset_id;
        if state.ruleset().attribute(attribute_id).is_none() {
            return Err(ScriptUseCaseError::AttributeNotFound(attribute_id));
        }

        // Held for the whole cascade; a concurrent rebuild publishes a new
        // snapshot without touching this one.
        let graph = self.graphs.snapshot(ruleset_id).await?;

        let request = CascadeRequest::new(character_id, attribute_id)
            .with_target(target)
            .with_limits(self.limits)
            .halting_on_script_error(self.halt_on_script_error);
        let cascade = run_cascade(&graph, &self.tracker, &mut state, request).await;

        let (pending_updates, announcements, logs) = state.into_effects();
        Ok(PropagationResult {
            cascade,
            pending_updates,
            announcements,
            logs,
        })
    }
}
