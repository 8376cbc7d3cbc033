//! Accessors: the objects a running script sees as `Owner`, `Target`,
//! `Ruleset` and `Self`, and the state they read and buffer writes into.

mod attribute;
mod chart;
mod inventory;
mod pending;
mod runtime_state;

pub(crate) use chart::{chart_column, chart_where};
pub(crate) use inventory::quantity_arg;
pub use pending::{PendingUpdate, PendingUpdates, INVENTORY_ADD_KEY, INVENTORY_REMOVE_KEY};
pub use runtime_state::{
    CharacterSheet, RulesetCache, RuntimeState, ScriptBindings, StateCheckpoint,
    DEFAULT_MAX_ACTION_DEPTH,
};

#[cfg(test)]
pub(crate) use runtime_state::test_support;
