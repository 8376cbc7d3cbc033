//! Script use case errors.

use crate::infrastructure::ports::RepoError;
use questbound_domain::{
    ActionId, ArchetypeId, AttributeId, CharacterId, DomainError, ItemId, RulesetId, ScriptEntityType,
    ScriptEvent, ScriptId,
};

/// Errors that stop a script use case before any script runs.
///
/// Failures inside a script are not errors here; they are reported in the
/// result so the caller still receives logs and partial cascade output.
#[derive(Debug, thiserror::Error)]
pub enum ScriptUseCaseError {
    #[error("Script not found: {0}")]
    ScriptNotFound(ScriptId),

    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(AttributeId),

    #[error("Archetype not found: {0}")]
    ArchetypeNotFound(ArchetypeId),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Action not found: {0}")]
    ActionNotFound(ActionId),

    #[error("Event '{event}' cannot be sent to {entity_type} scripts")]
    UnsupportedEvent {
        event: ScriptEvent,
        entity_type: ScriptEntityType,
    },

    #[error("Character {character_id} does not belong to ruleset {ruleset_id}")]
    RulesetMismatch {
        character_id: CharacterId,
        ruleset_id: RulesetId,
    },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
