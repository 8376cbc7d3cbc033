//! Breadth-first propagation of one attribute change.

use std::collections::VecDeque;

use serde::Serialize;

use questbound_domain::{AttributeId, CharacterId, ExecutionId, ScriptId};

use super::dependency_graph::DependencyGraph;
use super::execution_tracker::{
    ExecutionLimitReport, ExecutionLimits, ExecutionStats, ExecutionTracker, TrackerError,
};
use crate::qbscript::{run_script, RuntimeState, ScriptBindings, ScriptErrorReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeRequest {
    pub character_id: CharacterId,
    pub trigger_attribute_id: AttributeId,
    pub target: Option<CharacterId>,
    pub limits: ExecutionLimits,
    pub halt_on_script_error: bool,
}

impl CascadeRequest {
    pub fn new(character_id: CharacterId, trigger_attribute_id: AttributeId) -> Self {
        Self {
            character_id,
            trigger_attribute_id,
            target: None,
            limits: ExecutionLimits::default(),
            halt_on_script_error: false,
        }
    }

    pub fn with_target(mut self, target: Option<CharacterId>) -> Self {
        self.target = target;
        self
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn halting_on_script_error(mut self, halt: bool) -> Self {
        self.halt_on_script_error = halt;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptFailure {
    pub script_id: ScriptId,
    pub script_name: String,
    pub error: ScriptErrorReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeOutcome {
    pub execution_id: ExecutionId,
    /// Scripts in the order they ran, failed runs included.
    pub executed: Vec<ScriptId>,
    pub script_errors: Vec<ScriptFailure>,
    pub limit_error: Option<ExecutionLimitReport>,
    pub stats: Option<ExecutionStats>,
}

impl CascadeOutcome {
    pub fn stopped_by_limit(&self) -> bool {
        self.limit_error.is_some()
    }
}

/// Run every script reachable from the trigger attribute.
///
/// Only owner attributes whose value actually changed enqueue further
/// subscribers. A script already waiting in the queue is not queued twice.
/// Pending updates of scripts that completed are kept in `state` even when
/// a limit stops the cascade.
pub async fn run_cascade(
    graph: &DependencyGraph,
    tracker: &ExecutionTracker,
    state: &mut RuntimeState,
    request: CascadeRequest,
) -> CascadeOutcome {
    let execution_id = tracker.start_execution(
        request.character_id,
        Some(request.trigger_attribute_id),
        request.limits,
    );
    let mut outcome = CascadeOutcome {
        execution_id,
        executed: Vec::new(),
        script_errors: Vec::new(),
        limit_error: None,
        stats: None,
    };

    state.take_changed();
    let mut queue: VecDeque<ScriptId> = graph
        .get_execution_order(request.trigger_attribute_id)
        .into();

    while let Some(script_id) = queue.pop_front() {
        match tracker.record_execution(execution_id, script_id) {
            Ok(()) => {}
            Err(TrackerError::Limit(error)) => {
                outcome.limit_error = Some(error.report());
                break;
            }
            Err(error @ TrackerError::UnknownExecution(_)) => {
                tracing::warn!(error = %error, "Execution context disappeared mid-cascade");
                break;
            }
        }

        let Some(script) = state.ruleset().script(script_id).cloned() else {
            tracing::debug!(script_id = %script_id, "Subscriber is not loaded, skipping");
            continue;
        };
        outcome.executed.push(script_id);

        let bindings = ScriptBindings::for_script(request.character_id, request.target, &script);
        if let Err(error) = run_script(state, &script, bindings, None).await {
            outcome.script_errors.push(ScriptFailure {
                script_id,
                script_name: script.name.clone(),
                error: ScriptErrorReport::from(&error),
            });
            if request.halt_on_script_error {
                break;
            }
        }

        for (character_id, attribute_id) in state.take_changed() {
            if character_id != request.character_id {
                continue;
            }
            for next in graph.get_execution_order(attribute_id) {
                if !queue.contains(&next) {
                    queue.push_back(next);
                }
            }
        }
    }

    outcome.stats = tracker.get_stats(execution_id);
    tracker.end_execution(execution_id);

    tracing::info!(
        execution_id = %execution_id,
        character_id = %request.character_id,
        executed = outcome.executed.len(),
        failures = outcome.script_errors.len(),
        stopped_by_limit = outcome.stopped_by_limit(),
        "Cascade finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::infrastructure::clock::FixedClock;
    use crate::qbscript::accessors::test_support::*;
    use crate::qbscript::{PendingUpdate, PendingUpdates, Value};
    use crate::reactive::execution_tracker::LimitType;
    use chrono::Utc;
    use questbound_domain::{AttributeValue, Script, ScriptEntityType};

    fn tracker() -> ExecutionTracker {
        ExecutionTracker::new(Arc::new(FixedClock(Utc::now())))
    }

    fn attribute_script(builder: &StateBuilder, title: &str, source: &str) -> Script {
        let attribute_id = builder
            .ruleset
            .attribute_by_title(title)
            .unwrap()
            .id;
        Script::for_entity(
            builder.ruleset_id(),
            title,
            ScriptEntityType::Attribute,
            attribute_id,
            source,
        )
    }

    fn build(builder: StateBuilder, scripts: Vec<Script>) -> (RuntimeState, DependencyGraph) {
        let ruleset_id = builder.ruleset_id();
        let attributes = builder.ruleset.attributes().to_vec();
        let graph = DependencyGraph::build(ruleset_id, &scripts, &attributes);
        (builder.scripts(scripts).build(), graph)
    }

    fn value(state: &RuntimeState, title: &str) -> Value {
        let owner = character_named(state, "Aria");
        state
            .attribute_property(owner, attribute_id(state, title), "value")
            .unwrap()
    }

    #[tokio::test]
    async fn changes_propagate_breadth_first() {
        let builder = StateBuilder::new()
            .number("Strength", 16.0)
            .number("Strength Modifier", 0.0)
            .number("Attack", 0.0)
            .number("Carry", 0.0);
        let modifier = attribute_script(
            &builder,
            "Strength Modifier",
            "subscribe('Strength')\nSelf.set(floor((getAttr('Strength') - 10) / 2))\n",
        );
        let carry = attribute_script(
            &builder,
            "Carry",
            "subscribe('Strength')\nSelf.set(getAttr('Strength') * 15)\n",
        );
        let attack = attribute_script(
            &builder,
            "Attack",
            "subscribe('Strength Modifier')\nSelf.set(getAttr('Strength Modifier') + 2)\n",
        );
        let (mut state, graph) = build(builder, vec![modifier.clone(), carry.clone(), attack.clone()]);
        let owner = character_named(&state, "Aria");
        let request = CascadeRequest::new(owner, attribute_id(&state, "Strength"));

        let outcome = run_cascade(&graph, &tracker(), &mut state, request).await;

        assert_eq!(outcome.executed, vec![modifier.id, carry.id, attack.id]);
        assert!(outcome.script_errors.is_empty());
        assert!(!outcome.stopped_by_limit());
        assert_eq!(outcome.stats.as_ref().unwrap().total_executions, 3);
        assert_eq!(value(&state, "Attack"), Value::Number(5.0));
        assert_eq!(value(&state, "Carry"), Value::Number(240.0));
        assert_eq!(state.pending_updates().len(), 3);
    }

    #[tokio::test]
    async fn unchanged_values_do_not_retrigger() {
        let builder = StateBuilder::new()
            .number("Level", 1.0)
            .number("Tier", 1.0)
            .number("Title", 0.0);
        let tier = attribute_script(&builder, "Tier", "subscribe('Level')\nSelf.set(1)\n");
        let title = attribute_script(&builder, "Title", "subscribe('Tier')\nSelf.set(9)\n");
        let (mut state, graph) = build(builder, vec![tier.clone(), title]);
        let owner = character_named(&state, "Aria");
        let changed = attribute_id(&state, "Level");

        let outcome = run_cascade(
            &graph,
            &tracker(),
            &mut state,
            CascadeRequest::new(owner, changed),
        )
        .await;
        assert_eq!(outcome.executed, vec![tier.id]);
    }

    #[tokio::test]
    async fn mutual_recursion_is_stopped_by_the_per_script_limit() {
        let builder = StateBuilder::new().number("Ping", 0.0).number("Pong", 0.0);
        let ping = attribute_script(&builder, "Ping", "subscribe('Pong')\nSelf.add(1)\n");
        let pong = attribute_script(&builder, "Pong", "subscribe('Ping')\nSelf.add(1)\n");
        let (mut state, graph) = build(builder, vec![ping.clone(), pong.clone()]);
        let owner = character_named(&state, "Aria");
        assert!(graph.detect_cycles().has_cycle);

        let request = CascadeRequest::new(owner, attribute_id(&state, "Ping")).with_limits(
            ExecutionLimits {
                max_executions: 100,
                max_per_script: 3,
            },
        );
        let tracker = tracker();
        let outcome = run_cascade(&graph, &tracker, &mut state, request).await;

        let report = outcome.limit_error.clone().unwrap();
        assert_eq!(report.limit_type, LimitType::PerScriptLimit);
        assert_eq!(report.script_counts[&pong.id], 4);
        assert_eq!(report.execution_chain.len(), 7);
        // Updates of the runs that completed are kept.
        assert_eq!(value(&state, "Pong"), Value::Number(3.0));
        assert_eq!(value(&state, "Ping"), Value::Number(3.0));
        assert!(!tracker.is_active(outcome.execution_id));
    }

    #[tokio::test]
    async fn failing_script_is_reported_and_cascade_continues() {
        let builder = StateBuilder::new()
            .number("Base", 1.0)
            .number("Broken", 0.0)
            .number("Fine", 0.0);
        let broken = attribute_script(&builder, "Broken", "subscribe('Base')\nSelf.set(1)\nx = 1 / 0\n");
        let fine = attribute_script(&builder, "Fine", "subscribe('Base')\nSelf.set(7)\n");
        let (mut state, graph) = build(builder, vec![broken.clone(), fine.clone()]);
        let owner = character_named(&state, "Aria");
        let changed = attribute_id(&state, "Base");

        let outcome = run_cascade(
            &graph,
            &tracker(),
            &mut state,
            CascadeRequest::new(owner, changed),
        )
        .await;

        assert_eq!(outcome.executed, vec![broken.id, fine.id]);
        assert_eq!(outcome.script_errors.len(), 1);
        assert_eq!(outcome.script_errors[0].error.message, "Cannot divide by zero (line 3)");
        assert_eq!(value(&state, "Broken"), Value::Number(0.0));
        assert_eq!(value(&state, "Fine"), Value::Number(7.0));
    }

    #[tokio::test]
    async fn halting_on_error_stops_the_queue() {
        let builder = StateBuilder::new()
            .number("Base", 1.0)
            .number("Broken", 0.0)
            .number("Fine", 0.0);
        let broken = attribute_script(&builder, "Broken", "subscribe('Base')\nnope()\n");
        let fine = attribute_script(&builder, "Fine", "subscribe('Base')\nSelf.set(7)\n");
        let (mut state, graph) = build(builder, vec![broken, fine]);
        let owner = character_named(&state, "Aria");

        let request =
            CascadeRequest::new(owner, attribute_id(&state, "Base")).halting_on_script_error(true);
        let outcome = run_cascade(&graph, &tracker(), &mut state, request).await;
        assert_eq!(outcome.executed.len(), 1);
        assert_eq!(value(&state, "Fine"), Value::Number(0.0));
    }

    #[tokio::test]
    async fn target_writes_are_buffered_but_not_propagated() {
        let builder = StateBuilder::new()
            .number("Damage", 0.0)
            .number("Strike", 0.0)
            .number("HP", 10.0)
            .number("Bloodied", 0.0)
            .with_target();
        let strike = attribute_script(
            &builder,
            "Strike",
            "subscribe('Damage')\nif Target:\n    Target.Attribute('HP').subtract(getAttr('Damage'))\n",
        );
        let bloodied = attribute_script(&builder, "Bloodied", "subscribe('HP')\nSelf.set(1)\n");
        let (mut state, graph) = build(builder, vec![strike.clone(), bloodied]);
        let owner = character_named(&state, "Aria");
        let goblin = character_named(&state, "Goblin");
        let damage = attribute_id(&state, "Damage");
        state
            .write_attribute(owner, damage, AttributeValue::Number(3.0))
            .unwrap();

        let request = CascadeRequest::new(owner, damage).with_target(Some(goblin));
        let outcome = run_cascade(&graph, &tracker(), &mut state, request).await;

        assert_eq!(outcome.executed, vec![strike.id]);
        let goblin_hp = state
            .character(goblin)
            .unwrap()
            .attributes
            .get(&attribute_id(&state, "HP"))
            .unwrap()
            .clone();
        // The goblin had no HP value yet, so it started from the type's zero.
        assert_eq!(goblin_hp.value, AttributeValue::Number(-3.0));
        assert!(matches!(
            state.pending_updates().get(&PendingUpdates::attribute_key(goblin_hp.id)),
            Some(PendingUpdate::AttributeValue { character_id, .. }) if *character_id == goblin
        ));
        assert_eq!(value(&state, "Bloodied"), Value::Number(0.0));
    }
}
