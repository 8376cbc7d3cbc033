//! E2E tests for entity lifecycle events and global scripts.
//!
//! Tests verify:
//! - Archetype, item and action events reach their scripts
//! - Event results commit cleanly and feed propagation
//! - Global scripts act on a target character

use questbound_domain::{
    ActionId, ArchetypeId, AttributeValue, InventoryItem, ItemId, ScriptEvent,
};

use super::E2ETestContext;
use crate::infrastructure::ports::CharacterRepo;
use crate::use_cases::scripts::ScriptUseCaseError;

fn id<T: std::str::FromStr>(n: u64) -> T
where
    T::Err: std::fmt::Debug,
{
    format!("00000000-0000-4000-8000-{:012}", n).parse().unwrap()
}

async fn inventory(ctx: &E2ETestContext, name: &str) -> Vec<InventoryItem> {
    let character = ctx.store.find_character(name).await.unwrap();
    ctx.store
        .list_inventory_items(character.inventory_id)
        .await
        .unwrap()
}

async fn quantity(ctx: &E2ETestContext, name: &str, item_id: ItemId) -> u32 {
    inventory(ctx, name)
        .await
        .iter()
        .filter(|entry| entry.item_id == item_id)
        .map(|entry| entry.quantity)
        .sum()
}

#[tokio::test]
async fn granting_an_archetype_equips_the_character() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;
    let scripts = &ctx.app.use_cases.scripts;

    let result = scripts
        .entity_events
        .archetype_event(id::<ArchetypeId>(50), aria, ScriptEvent::OnAdd)
        .await
        .unwrap();
    assert!(result.is_ok(), "{:?}", result.error);
    let strength = ctx.attribute("Strength").await;
    assert_eq!(result.changed_attributes, vec![strength]);

    ctx.commit(&result.pending_updates).await;
    assert_eq!(quantity(&ctx, "Aria", id(20)).await, 1);
    assert_eq!(quantity(&ctx, "Aria", id(21)).await, 20);
    assert_eq!(ctx.number("Aria", "Strength").await, 15.0);

    // The host follows up each changed attribute with a cascade.
    let cascade = scripts
        .propagate
        .execute(aria, strength, None)
        .await
        .unwrap();
    ctx.commit(&cascade.pending_updates).await;
    assert_eq!(ctx.number("Aria", "Carry Capacity").await, 225.0);

    let removed = scripts
        .entity_events
        .archetype_event(id::<ArchetypeId>(50), aria, ScriptEvent::OnRemove)
        .await
        .unwrap();
    ctx.commit(&removed.pending_updates).await;
    assert_eq!(quantity(&ctx, "Aria", id(20)).await, 0);
    assert_eq!(quantity(&ctx, "Aria", id(21)).await, 20);
    assert_eq!(ctx.number("Aria", "Strength").await, 14.0);
}

#[tokio::test]
async fn drinking_a_potion_heals_and_uses_it_up() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;

    let result = ctx
        .app
        .use_cases
        .scripts
        .entity_events
        .item_event(id::<ItemId>(22), aria, ScriptEvent::OnConsume)
        .await
        .unwrap();
    assert_eq!(
        result.changed_attributes,
        vec![ctx.attribute("Hit Points").await]
    );

    ctx.commit(&result.pending_updates).await;
    assert_eq!(ctx.number("Aria", "Hit Points").await, 17.0);
    assert_eq!(quantity(&ctx, "Aria", id(22)).await, 1);
}

#[tokio::test]
async fn equipping_the_longbow_announces_and_adjusts_attack() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;
    let events = &ctx.app.use_cases.scripts.entity_events;

    let equipped = events
        .item_event(id::<ItemId>(20), aria, ScriptEvent::OnEquip)
        .await
        .unwrap();
    assert_eq!(equipped.announcements, vec!["You string the longbow".to_string()]);
    ctx.commit(&equipped.pending_updates).await;
    assert_eq!(ctx.number("Aria", "Attack Bonus").await, 6.0);

    let unequipped = events
        .item_event(id::<ItemId>(20), aria, ScriptEvent::OnUnequip)
        .await
        .unwrap();
    assert!(unequipped.announcements.is_empty());
    ctx.commit(&unequipped.pending_updates).await;
    assert_eq!(ctx.number("Aria", "Attack Bonus").await, 4.0);
}

#[tokio::test]
async fn second_wind_rolls_and_returns_the_healing() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;

    let result = ctx
        .app
        .use_cases
        .scripts
        .entity_events
        .action_event(id::<ActionId>(30), aria, ScriptEvent::OnActivate, None)
        .await
        .unwrap();

    let healed: f64 = result.return_value.as_deref().unwrap().parse().unwrap();
    assert!((2.0..=11.0).contains(&healed));
    assert_eq!(
        result.announcements,
        vec![format!("Second Wind restores {} hit points", healed)]
    );
    ctx.commit(&result.pending_updates).await;
    assert_eq!(ctx.number("Aria", "Hit Points").await, 12.0 + healed);
}

#[tokio::test]
async fn action_without_a_deactivate_handler_does_nothing() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;

    let result = ctx
        .app
        .use_cases
        .scripts
        .entity_events
        .action_event(id::<ActionId>(30), aria, ScriptEvent::OnDeactivate, None)
        .await
        .unwrap();
    assert!(result.is_ok());
    assert!(result.pending_updates.is_empty());
    assert_eq!(result.return_value, None);
}

#[tokio::test]
async fn volley_needs_arrows_then_hits_the_target() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;
    let goblin = ctx.character("Goblin").await;
    let scripts = &ctx.app.use_cases.scripts;
    let volley = ctx.store.find_script("Volley").await.unwrap();

    let empty = scripts
        .execute_script
        .execute(aria, volley.id, None, Some(goblin))
        .await
        .unwrap();
    assert_eq!(empty.return_value.as_deref(), Some("0"));
    assert_eq!(empty.announcements, vec!["No arrows left".to_string()]);
    assert!(empty.pending_updates.is_empty());

    let granted = scripts
        .entity_events
        .archetype_event(id::<ArchetypeId>(50), aria, ScriptEvent::OnAdd)
        .await
        .unwrap();
    ctx.commit(&granted.pending_updates).await;

    let fired = scripts
        .execute_script
        .execute(aria, volley.id, None, Some(goblin))
        .await
        .unwrap();
    assert_eq!(fired.return_value.as_deref(), Some("3"));
    assert_eq!(fired.logs, vec!["fired 3 arrows at Goblin".to_string()]);
    // Only the owner's attributes are reported for propagation.
    assert!(fired.changed_attributes.is_empty());

    ctx.commit(&fired.pending_updates).await;
    assert_eq!(quantity(&ctx, "Aria", id(21)).await, 17);
    assert_eq!(
        ctx.value("Goblin", "Hit Points").await,
        AttributeValue::Number(4.0)
    );
}

#[tokio::test]
async fn item_events_are_rejected_for_archetypes() {
    let ctx = E2ETestContext::setup().await.unwrap();
    let aria = ctx.character("Aria").await;

    let err = ctx
        .app
        .use_cases
        .scripts
        .entity_events
        .archetype_event(id::<ArchetypeId>(50), aria, ScriptEvent::OnEquip)
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptUseCaseError::UnsupportedEvent { .. }));
    assert_eq!(
        err.to_string(),
        "Event 'on_equip' cannot be sent to archetype scripts"
    );
}
