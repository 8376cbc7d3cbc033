//! Lifecycle events a script may handle.
//!
//! A script declares a handler by defining a top-level function with the
//! event's name, e.g. `on_equip():`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptEvent {
    OnEquip,
    OnUnequip,
    OnConsume,
    OnActivate,
    OnDeactivate,
    OnAdd,
    OnRemove,
}

impl ScriptEvent {
    pub const ALL: [ScriptEvent; 7] = [
        Self::OnEquip,
        Self::OnUnequip,
        Self::OnConsume,
        Self::OnActivate,
        Self::OnDeactivate,
        Self::OnAdd,
        Self::OnRemove,
    ];

    /// Handler name as written in QBScript source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnEquip => "on_equip",
            Self::OnUnequip => "on_unequip",
            Self::OnConsume => "on_consume",
            Self::OnActivate => "on_activate",
            Self::OnDeactivate => "on_deactivate",
            Self::OnAdd => "on_add",
            Self::OnRemove => "on_remove",
        }
    }

    /// Events an archetype script can receive.
    pub fn is_archetype_event(&self) -> bool {
        matches!(self, Self::OnAdd | Self::OnRemove)
    }

    /// Events an item script can receive.
    pub fn is_item_event(&self) -> bool {
        matches!(self, Self::OnEquip | Self::OnUnequip | Self::OnConsume)
    }

    /// Events an action script can receive.
    pub fn is_action_event(&self) -> bool {
        matches!(self, Self::OnActivate | Self::OnDeactivate)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl fmt::Display for ScriptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScriptEvent {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s.trim())
            .ok_or_else(|| DomainError::parse(format!("Unknown script event: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for event in ScriptEvent::ALL {
            assert_eq!(event.as_str().parse::<ScriptEvent>().unwrap(), event);
        }
    }

    #[test]
    fn event_families_are_disjoint() {
        for event in ScriptEvent::ALL {
            let families = [
                event.is_archetype_event(),
                event.is_item_event(),
                event.is_action_event(),
            ];
            assert_eq!(families.iter().filter(|f| **f).count(), 1, "{}", event);
        }
    }

    #[test]
    fn ordinary_names_are_not_events() {
        assert!(ScriptEvent::from_name("calculate").is_none());
        assert!("on_level_up".parse::<ScriptEvent>().is_err());
    }
}
