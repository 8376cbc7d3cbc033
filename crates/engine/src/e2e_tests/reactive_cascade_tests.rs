//! E2E tests for attribute change propagation.
//!
//! Tests verify:
//! - Derived attributes follow their inputs breadth-first
//! - Chart lookups feed computed values
//! - Unchanged results stop the ripple
//! - Runaway loops are stopped by the execution tracker

use questbound_domain::{AttributeValue, Script, ScriptEntityType, ScriptId};

use super::E2ETestContext;
use crate::infrastructure::ports::CharacterRepo;
use crate::qbscript::PendingUpdates;
use crate::reactive::LimitType;

fn script_id(n: u64) -> ScriptId {
    format!("00000000-0000-4000-8000-{:012}", n).parse().unwrap()
}

#[tokio::test]
async fn strength_change_ripples_through_derived_stats() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;
    let strength = ctx.set("Aria", "Strength", AttributeValue::Number(18.0)).await;

    let result = ctx
        .app
        .use_cases
        .scripts
        .propagate
        .execute(aria, strength, None)
        .await
        .unwrap();

    // Modifier and Carry Capacity first, then what the modifier feeds.
    assert_eq!(
        result.cascade.executed,
        vec![script_id(60), script_id(61), script_id(63)]
    );
    assert!(result.cascade.script_errors.is_empty());
    assert_eq!(result.cascade.stats.as_ref().unwrap().total_executions, 3);

    ctx.commit(&result.pending_updates).await;
    assert_eq!(ctx.number("Aria", "Strength Modifier").await, 4.0);
    assert_eq!(ctx.number("Aria", "Carry Capacity").await, 270.0);
    assert_eq!(ctx.number("Aria", "Attack Bonus").await, 6.0);
}

#[tokio::test]
async fn level_up_reads_the_level_table() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;
    let level = ctx.set("Aria", "Level", AttributeValue::Number(5.0)).await;

    let result = ctx
        .app
        .use_cases
        .scripts
        .propagate
        .execute(aria, level, None)
        .await
        .unwrap();

    assert_eq!(
        result.cascade.executed,
        vec![script_id(62), script_id(64), script_id(63), script_id(65)]
    );
    ctx.commit(&result.pending_updates).await;

    assert_eq!(ctx.number("Aria", "Proficiency Bonus").await, 3.0);
    assert_eq!(ctx.number("Aria", "Max Hit Points").await, 36.0);
    assert_eq!(ctx.number("Aria", "Attack Bonus").await, 5.0);
    // 12 of 36 hit points is under half.
    assert_eq!(
        ctx.value("Aria", "Condition").await,
        AttributeValue::Text("Bloodied".into())
    );
}

#[tokio::test]
async fn unchanged_result_stops_the_ripple() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;
    // 15 keeps the modifier at +2, so Attack Bonus never runs.
    let strength = ctx.set("Aria", "Strength", AttributeValue::Number(15.0)).await;

    let result = ctx
        .app
        .use_cases
        .scripts
        .propagate
        .execute(aria, strength, None)
        .await
        .unwrap();

    assert_eq!(result.cascade.executed, vec![script_id(60), script_id(61)]);
    ctx.commit(&result.pending_updates).await;
    assert_eq!(ctx.number("Aria", "Carry Capacity").await, 225.0);
    assert_eq!(ctx.number("Aria", "Attack Bonus").await, 4.0);
}

#[tokio::test]
async fn dropping_to_zero_marks_the_character_down() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;
    let hp = ctx.set("Aria", "Hit Points", AttributeValue::Number(0.0)).await;

    let result = ctx
        .app
        .use_cases
        .scripts
        .propagate
        .execute(aria, hp, None)
        .await
        .unwrap();

    let condition = ctx
        .store
        .get_character_attribute(aria, ctx.attribute("Condition").await)
        .await
        .unwrap()
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    let key = PendingUpdates::attribute_key(condition.id);
    assert_eq!(json["pendingUpdates"][key.as_str()]["value"], "Down");
    assert_eq!(json["pendingUpdates"][key.as_str()]["type"], "attributeValue");

    ctx.commit(&result.pending_updates).await;
    assert_eq!(
        ctx.value("Aria", "Condition").await,
        AttributeValue::Text("Down".into())
    );
}

#[tokio::test]
async fn self_feeding_script_is_stopped_by_the_tracker() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;
    let inspired = ctx.attribute("Inspired").await;
    let toggle = Script::for_entity(
        ctx.ruleset_id,
        "Inspired",
        ScriptEntityType::Attribute,
        inspired,
        "subscribe('Inspired')\nSelf.flip()\n",
    );
    ctx.store.insert_script(toggle.clone()).await;

    let graph = ctx
        .app
        .use_cases
        .scripts
        .build_graph
        .rebuild(ctx.ruleset_id)
        .await
        .unwrap();
    assert_eq!(graph.detect_cycles().cycle, vec![toggle.id, toggle.id]);

    let result = ctx
        .app
        .use_cases
        .scripts
        .propagate
        .execute(aria, inspired, None)
        .await
        .unwrap();

    let limit = result.cascade.limit_error.as_ref().unwrap();
    assert_eq!(limit.limit_type, LimitType::PerScriptLimit);
    assert_eq!(limit.script_counts[&toggle.id], 11);
    assert_eq!(result.cascade.executed.len(), 10);
    // Ten flips land back on false; the buffered write is still reported.
    assert_eq!(result.pending_updates.len(), 1);
    assert!(ctx.app.tracker.get_active_executions().is_empty());
}
