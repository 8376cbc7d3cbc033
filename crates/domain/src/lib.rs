extern crate self as questbound_domain;

pub mod common;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use entities::{
    Action, Archetype, Attribute, Character, CharacterAttribute, Chart, InventoryItem, Item,
    Script, ScriptEntityType,
};

pub use error::DomainError;

// Re-export ID types
pub use ids::{
    ActionId, ArchetypeId, AttributeId, CharacterAttributeId, CharacterId, ChartId, ExecutionId,
    InventoryId, InventoryItemId, ItemId, RulesetId, ScriptId,
};

pub use value_objects::{
    format_number, generate_script_path, parse_script_path, slugify, AttributeType,
    AttributeValue, DiceFormula, DiceParseError, DiceRollResult, ScriptEvent, ScriptPath,
};
