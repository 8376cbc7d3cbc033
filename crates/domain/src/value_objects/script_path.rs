//! File paths for scripts exported to / imported from a ruleset directory.
//!
//! Scripts live at `scripts/<entity dir>/<slug>.qbs`, where the slug is the
//! entity name lowercased with every run of non-alphanumerics collapsed to `_`.

use serde::{Deserialize, Serialize};

use crate::entities::ScriptEntityType;

const SCRIPT_ROOT: &str = "scripts";
const SCRIPT_EXTENSION: &str = "qbs";

/// Entity type and slug recovered from a script path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPath {
    pub entity_type: ScriptEntityType,
    pub name: String,
}

/// Directory name for an entity type.
fn directory_for(entity_type: ScriptEntityType) -> &'static str {
    match entity_type {
        ScriptEntityType::Attribute => "attributes",
        ScriptEntityType::Action => "actions",
        ScriptEntityType::Item => "items",
        ScriptEntityType::Archetype => "archetypes",
        ScriptEntityType::Global => "global",
        ScriptEntityType::CharacterLoader => "character_loaders",
    }
}

fn entity_type_for(directory: &str) -> Option<ScriptEntityType> {
    [
        ScriptEntityType::Attribute,
        ScriptEntityType::Action,
        ScriptEntityType::Item,
        ScriptEntityType::Archetype,
        ScriptEntityType::Global,
        ScriptEntityType::CharacterLoader,
    ]
    .into_iter()
    .find(|t| directory_for(*t) == directory)
}

/// Lowercase, collapse non-alphanumeric runs to `_`, trim leading/trailing `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    slug
}

/// Path a script for `name` should be written to.
pub fn generate_script_path(entity_type: ScriptEntityType, name: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        SCRIPT_ROOT,
        directory_for(entity_type),
        slugify(name),
        SCRIPT_EXTENSION
    )
}

/// Inverse of [`generate_script_path`]. Returns `None` for paths outside the layout.
pub fn parse_script_path(path: &str) -> Option<ScriptPath> {
    let normalized = path.replace('\\', "/");
    let mut parts = normalized.trim_start_matches("./").split('/');

    if parts.next()? != SCRIPT_ROOT {
        return None;
    }
    let entity_type = entity_type_for(parts.next()?)?;
    let file = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let name = file.strip_suffix(&format!(".{}", SCRIPT_EXTENSION))?;
    if name.is_empty() {
        return None;
    }

    Some(ScriptPath {
        entity_type,
        name: name.to_string(),
    })
}
