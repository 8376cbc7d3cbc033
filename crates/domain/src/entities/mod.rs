//! Ruleset and character records consumed by the script runtime.

mod attribute;
mod character;
mod chart;
mod item;
mod script;

pub use attribute::{Attribute, CharacterAttribute};
pub use character::{Action, Archetype, Character};
pub use chart::Chart;
pub use item::{InventoryItem, Item};
pub use script::{Script, ScriptEntityType};
