//! Value objects shared across the ruleset model.

mod attribute_value;
mod dice;
mod script_event;
mod script_path;

pub use attribute_value::{format_number, AttributeType, AttributeValue};
pub use dice::{DiceFormula, DiceParseError, DiceRollResult};
pub use script_event::ScriptEvent;
pub use script_path::{generate_script_path, parse_script_path, slugify, ScriptPath};
