//! Attribute entities
//!
//! [`Attribute`] is the ruleset-level definition ("Hit Points", "Class").
//! [`CharacterAttribute`] is one character's current value for it.

use serde::{Deserialize, Serialize};

use crate::value_objects::{AttributeType, AttributeValue};
use crate::{AttributeId, CharacterAttributeId, CharacterId, RulesetId};

/// Ruleset-level attribute definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: AttributeId,
    pub ruleset_id: RulesetId,
    /// Scripts subscribe to attributes by this title
    pub title: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub default_value: Option<AttributeValue>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Allowed values for list attributes, in cycling order
    #[serde(default)]
    pub options: Vec<String>,
}

impl Attribute {
    pub fn new(ruleset_id: RulesetId, title: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            id: AttributeId::new(),
            ruleset_id,
            title: title.into(),
            attribute_type,
            default_value: None,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: AttributeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, value: AttributeValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Value a character starts with for this attribute.
    pub fn initial_value(&self) -> AttributeValue {
        if let Some(value) = &self.default_value {
            return value.clone();
        }
        match self.attribute_type {
            AttributeType::List => self
                .options
                .first()
                .map(|o| AttributeValue::Text(o.clone()))
                .unwrap_or_else(|| self.attribute_type.zero_value()),
            other => other.zero_value(),
        }
    }
}

/// A character's instance of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterAttribute {
    pub id: CharacterAttributeId,
    pub character_id: CharacterId,
    pub attribute_id: AttributeId,
    pub value: AttributeValue,
}

impl CharacterAttribute {
    pub fn new(character_id: CharacterId, attribute_id: AttributeId, value: AttributeValue) -> Self {
        Self {
            id: CharacterAttributeId::new(),
            character_id,
            attribute_id,
            value,
        }
    }

    /// Instantiate a definition for a character with its initial value.
    pub fn from_definition(character_id: CharacterId, attribute: &Attribute) -> Self {
        Self::new(character_id, attribute.id, attribute.initial_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_attribute_starts_at_first_option() {
        let attribute = Attribute::new(RulesetId::new(), "Size", AttributeType::List)
            .with_options(["Small", "Medium", "Large"]);
        assert_eq!(attribute.initial_value(), AttributeValue::Text("Small".into()));
    }

    #[test]
    fn explicit_default_wins() {
        let attribute = Attribute::new(RulesetId::new(), "HP", AttributeType::Number)
            .with_default(AttributeValue::Number(10.0));
        let instance = CharacterAttribute::from_definition(CharacterId::new(), &attribute);
        assert_eq!(instance.value, AttributeValue::Number(10.0));
        assert_eq!(instance.attribute_id, attribute.id);
    }

    #[test]
    fn deserializes_with_optional_fields_missing() {
        let json = format!(
            r#"{{"id":"{}","rulesetId":"{}","title":"Level","type":"number"}}"#,
            AttributeId::new(),
            RulesetId::new()
        );
        let attribute: Attribute = serde_json::from_str(&json).unwrap();
        assert_eq!(attribute.attribute_type, AttributeType::Number);
        assert!(attribute.options.is_empty());
        assert_eq!(attribute.max, None);
    }
}
