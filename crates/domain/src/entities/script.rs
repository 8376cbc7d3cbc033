//! Script entity - QBScript source attached to a ruleset entity
//!
//! A script belongs to exactly one ruleset. Non-global scripts are bound to the
//! entity they describe (an attribute, item, action, archetype, or character
//! loader); global scripts stand alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{DomainError, RulesetId, ScriptId};

/// Kind of entity a script is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptEntityType {
    Attribute,
    Action,
    Item,
    Archetype,
    Global,
    CharacterLoader,
}

impl ScriptEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::Action => "action",
            Self::Item => "item",
            Self::Archetype => "archetype",
            Self::Global => "global",
            Self::CharacterLoader => "characterLoader",
        }
    }
}

impl fmt::Display for ScriptEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScriptEntityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attribute" => Ok(Self::Attribute),
            "action" => Ok(Self::Action),
            "item" => Ok(Self::Item),
            "archetype" => Ok(Self::Archetype),
            "global" => Ok(Self::Global),
            "characterLoader" => Ok(Self::CharacterLoader),
            _ => Err(DomainError::parse(format!("Unknown script entity type: {}", s))),
        }
    }
}

/// QBScript source owned by a ruleset.
///
/// Immutable for the duration of one execution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: ScriptId,
    pub ruleset_id: RulesetId,
    pub name: String,
    pub source_code: String,
    pub entity_type: ScriptEntityType,
    /// Id of the attribute/item/action/archetype this script belongs to.
    /// Present iff `is_global` is false.
    pub entity_id: Option<Uuid>,
    pub is_global: bool,
    pub enabled: bool,
}

impl Script {
    /// Create an enabled script bound to an entity.
    pub fn for_entity(
        ruleset_id: RulesetId,
        name: impl Into<String>,
        entity_type: ScriptEntityType,
        entity_id: impl Into<Uuid>,
        source_code: impl Into<String>,
    ) -> Self {
        Self {
            id: ScriptId::new(),
            ruleset_id,
            name: name.into(),
            source_code: source_code.into(),
            entity_type,
            entity_id: Some(entity_id.into()),
            is_global: false,
            enabled: true,
        }
    }

    /// Create an enabled global script.
    pub fn global(
        ruleset_id: RulesetId,
        name: impl Into<String>,
        source_code: impl Into<String>,
    ) -> Self {
        Self {
            id: ScriptId::new(),
            ruleset_id,
            name: name.into(),
            source_code: source_code.into(),
            entity_type: ScriptEntityType::Global,
            entity_id: None,
            is_global: true,
            enabled: true,
        }
    }

    pub fn with_id(mut self, id: ScriptId) -> Self {
        self.id = id;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check the entity binding invariant.
    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.is_global, self.entity_id) {
            (true, Some(_)) => Err(DomainError::validation(format!(
                "Global script '{}' cannot reference an entity",
                self.name
            ))),
            (false, None) => Err(DomainError::validation(format!(
                "Script '{}' must reference the {} it belongs to",
                self.name, self.entity_type
            ))),
            _ => Ok(()),
        }
    }

    /// Whether this script is attached to the given entity.
    pub fn is_attached_to(&self, entity_type: ScriptEntityType, entity_id: Uuid) -> bool {
        self.entity_type == entity_type && self.entity_id == Some(entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeId;

    #[test]
    fn entity_scripts_validate() {
        let script = Script::for_entity(
            RulesetId::new(),
            "HP",
            ScriptEntityType::Attribute,
            AttributeId::new(),
            "",
        );
        assert!(script.validate().is_ok());
        assert!(Script::global(RulesetId::new(), "Init", "").validate().is_ok());
    }

    #[test]
    fn global_script_with_entity_is_invalid() {
        let mut script = Script::global(RulesetId::new(), "Init", "");
        script.entity_id = Some(Uuid::new_v4());
        assert!(matches!(script.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn entity_script_without_entity_is_invalid() {
        let mut script = Script::for_entity(
            RulesetId::new(),
            "Sword",
            ScriptEntityType::Item,
            Uuid::new_v4(),
            "",
        );
        script.entity_id = None;
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("must reference the item"));
    }

    #[test]
    fn entity_type_serializes_camel_case() {
        let json = serde_json::to_string(&ScriptEntityType::CharacterLoader).unwrap();
        assert_eq!(json, "\"characterLoader\"");
        assert_eq!(
            "characterLoader".parse::<ScriptEntityType>().unwrap(),
            ScriptEntityType::CharacterLoader
        );
    }
}
