//! Running one script against a [`RuntimeState`].

use questbound_domain::{Script, ScriptEvent};

use super::accessors::{RuntimeState, ScriptBindings};
use super::error::ScriptError;
use super::evaluator::Evaluator;
use super::parser::parse_source;
use super::value::Value;

/// Parse and run a script: the top level first, then the handler for `event`
/// when one is given and defined. A failing script leaves `state` exactly as
/// it was before the call, except for captured log lines.
///
/// Returns the handler's return value when a handler ran, else the top level's.
pub async fn run_script(
    state: &mut RuntimeState,
    script: &Script,
    bindings: ScriptBindings,
    event: Option<ScriptEvent>,
) -> Result<Value, ScriptError> {
    let checkpoint = state.checkpoint();
    tracing::debug!(script_id = %script.id, script = %script.name, "Running script");

    let result = evaluate(state, script, bindings, event).await;
    if let Err(error) = &result {
        tracing::warn!(
            script_id = %script.id,
            script = %script.name,
            error = %error,
            "Script failed, rolled back its updates"
        );
        state.restore(checkpoint);
    }
    result
}

async fn evaluate(
    state: &mut RuntimeState,
    script: &Script,
    bindings: ScriptBindings,
    event: Option<ScriptEvent>,
) -> Result<Value, ScriptError> {
    let program = parse_source(&script.source_code)?;
    let mut evaluator = Evaluator::new(state, bindings);
    let value = evaluator.run(&program).await?;
    match event {
        Some(event) => Ok(evaluator.invoke_handler(event).await?.unwrap_or(value)),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qbscript::accessors::test_support::*;
    use questbound_domain::{Item, ScriptEntityType};

    fn attribute_script(state: &RuntimeState, title: &str, source: &str) -> Script {
        Script::for_entity(
            state.ruleset().ruleset_id,
            title,
            ScriptEntityType::Attribute,
            attribute_id(state, title),
            source,
        )
    }

    #[tokio::test]
    async fn failing_script_rolls_back_its_writes() {
        let mut state = StateBuilder::new().number("HP", 10.0).number("Mana", 5.0).build();
        let owner = character_named(&state, "Aria");
        let script = attribute_script(
            &state,
            "Mana",
            "Owner.Attribute('HP').set(1)\nannounce('drained')\nlog('before failure')\nx = 1 / 0\n",
        );

        let err = run_script(&mut state, &script, ScriptBindings::new(owner), None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "evaluation");
        assert_eq!(err.line(), Some(4));
        assert!(state.pending_updates().is_empty());
        assert!(state.announcements().is_empty());
        assert_eq!(state.logs(), ["before failure".to_string()]);
        assert!(state.take_changed().is_empty());
        assert_eq!(
            state
                .attribute_property(owner, attribute_id(&state, "HP"), "value")
                .unwrap(),
            Value::Number(10.0)
        );
    }

    #[tokio::test]
    async fn parse_errors_are_reported_without_running() {
        let mut state = StateBuilder::new().number("HP", 10.0).build();
        let owner = character_named(&state, "Aria");
        let script = attribute_script(&state, "HP", "Owner.Attribute('HP').set(1)\nif :\n");

        let err = run_script(&mut state, &script, ScriptBindings::new(owner), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(state.pending_updates().is_empty());
    }

    #[tokio::test]
    async fn handler_runs_after_top_level() {
        let builder = StateBuilder::new().number("AC", 10.0);
        let shield = Item::new(builder.ruleset_id(), "Shield");
        let mut state = builder.build();
        let owner = character_named(&state, "Aria");
        let script = Script::for_entity(
            state.ruleset().ruleset_id,
            "Shield",
            ScriptEntityType::Item,
            shield.id,
            "log('loaded')\non_equip():\n    Owner.Attribute('AC').add(2)\n    return 'ok'\n",
        );

        let value = run_script(
            &mut state,
            &script,
            ScriptBindings::new(owner),
            Some(ScriptEvent::OnEquip),
        )
        .await
        .unwrap();

        assert_eq!(value, Value::from("ok"));
        assert_eq!(state.logs(), ["loaded".to_string()]);
        assert_eq!(state.pending_updates().len(), 1);
    }

    #[tokio::test]
    async fn attribute_script_binds_self() {
        let mut state = StateBuilder::new().number("Level", 3.0).number("Proficiency", 0.0).build();
        let owner = character_named(&state, "Aria");
        let script = attribute_script(
            &state,
            "Proficiency",
            "subscribe('Level')\nSelf.set(2 + floor((getAttr('Level') - 1) / 4))\n",
        );
        let bindings = ScriptBindings::for_script(owner, None, &script);

        run_script(&mut state, &script, bindings, None).await.unwrap();
        assert_eq!(
            state
                .attribute_property(owner, attribute_id(&state, "Proficiency"), "value")
                .unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            state.take_changed(),
            vec![(owner, attribute_id(&state, "Proficiency"))]
        );
    }
}
