//! Runtime values.
//!
//! QBScript is dynamically typed. Accessor objects are carried as
//! [`ObjectRef`] handles into the [`RuntimeState`](super::accessors::RuntimeState)
//! rather than as live references, so values stay cheap to clone.

use std::fmt;
use std::sync::Arc;

use questbound_domain::{
    format_number, ActionId, AttributeId, AttributeValue, CharacterId, ChartId, InventoryItemId,
};

use super::ast::FunctionDef;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    String(String),
    Boolean(bool),
    List(Vec<Value>),
    Object(ObjectRef),
    Function(Arc<FunctionDef>),
    Builtin(Builtin),
}

/// Handle to an accessor object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef {
    Character(CharacterId),
    Ruleset,
    Attribute {
        character_id: CharacterId,
        attribute_id: AttributeId,
    },
    Item {
        character_id: CharacterId,
        inventory_item_id: InventoryItemId,
    },
    Action {
        character_id: CharacterId,
        action_id: ActionId,
    },
    Chart(ChartId),
}

impl ObjectRef {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Character(_) => "character",
            Self::Ruleset => "ruleset",
            Self::Attribute { .. } => "attribute",
            Self::Item { .. } => "item",
            Self::Action { .. } => "action",
            Self::Chart(_) => "chart",
        }
    }
}

/// Free functions available to every script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Subscribe,
    Roll,
    Announce,
    Log,
    Floor,
    Ceil,
    Round,
    GetAttr,
    GetChart,
}

impl Builtin {
    pub const ALL: [Builtin; 9] = [
        Self::Subscribe,
        Self::Roll,
        Self::Announce,
        Self::Log,
        Self::Floor,
        Self::Ceil,
        Self::Round,
        Self::GetAttr,
        Self::GetChart,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Roll => "roll",
            Self::Announce => "announce",
            Self::Log => "log",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::GetAttr => "getAttr",
            Self::GetChart => "getChart",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
            Value::Object(object) => object.kind(),
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Object(_) | Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a storable attribute value. Lists, objects and functions
    /// have no stored form.
    pub fn to_attribute_value(&self) -> Option<AttributeValue> {
        match self {
            Value::Number(n) => Some(AttributeValue::Number(*n)),
            Value::String(s) => Some(AttributeValue::Text(s.clone())),
            Value::Boolean(b) => Some(AttributeValue::Boolean(*b)),
            _ => None,
        }
    }

    /// Parse a chart or text cell, preferring a number when it reads as one.
    pub fn from_cell(cell: &str) -> Value {
        let trimmed = cell.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if !trimmed.is_empty() => Value::Number(n),
            _ => Value::String(cell.to_string()),
        }
    }
}

impl From<&AttributeValue> for Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Number(n) => Value::Number(*n),
            AttributeValue::Text(s) => Value::String(s.clone()),
            AttributeValue::Boolean(b) => Value::Boolean(*b),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(object) => write!(f, "<{}>", object.kind()),
            Value::Function(def) => write!(f, "<function {}>", def.name),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}
