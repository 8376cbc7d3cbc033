//! Attribute to subscriber-script graph for one ruleset.
//!
//! Built from the enabled scripts of a ruleset by resolving each subscribed
//! title to an attribute id. The graph is immutable once built; edits to
//! scripts or attributes require a full rebuild.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use questbound_domain::common::normalize_title;
use questbound_domain::{Attribute, AttributeId, RulesetId, Script, ScriptEntityType, ScriptId};

use crate::qbscript::analyze_script;

/// One analyzed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub script_id: ScriptId,
    /// Attribute titles exactly as written in `subscribe(...)`.
    pub subscriptions: Vec<String>,
    /// Subscriptions that resolved to attributes of the ruleset.
    pub dependencies: Vec<AttributeId>,
    pub event_handlers: Vec<String>,
    /// The attribute this script computes, for attribute scripts.
    #[serde(default)]
    pub owner_attribute: Option<AttributeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub has_cycle: bool,
    /// Scripts along the first cycle found, starting and ending with the same script.
    pub cycle: Vec<ScriptId>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    ruleset_id: RulesetId,
    nodes: Vec<DependencyNode>,
    subscribers: HashMap<AttributeId, Vec<ScriptId>>,
}

impl DependencyGraph {
    /// Analyze every enabled script and index it by the attributes it subscribes to.
    pub fn build(ruleset_id: RulesetId, scripts: &[Script], attributes: &[Attribute]) -> Self {
        let titles: HashMap<String, AttributeId> = attributes
            .iter()
            .map(|attribute| (normalize_title(&attribute.title), attribute.id))
            .collect();

        let nodes = scripts
            .iter()
            .filter(|script| script.enabled)
            .map(|script| {
                let analysis = analyze_script(&script.source_code);
                let mut dependencies = Vec::new();
                for title in &analysis.subscriptions {
                    match titles.get(&normalize_title(title)) {
                        Some(id) if !dependencies.contains(id) => dependencies.push(*id),
                        Some(_) => {}
                        None => tracing::debug!(
                            script_id = %script.id,
                            title = %title,
                            "Subscription does not match any attribute"
                        ),
                    }
                }
                let owner_attribute = match (script.entity_type, script.entity_id) {
                    (ScriptEntityType::Attribute, Some(id)) => Some(AttributeId::from_uuid(id)),
                    _ => None,
                };
                DependencyNode {
                    script_id: script.id,
                    subscriptions: analysis.subscriptions,
                    dependencies,
                    event_handlers: analysis.event_handlers.into_keys().collect(),
                    owner_attribute,
                }
            })
            .collect();

        Self::from_nodes(ruleset_id, nodes)
    }

    /// Rebuild the lookup index from stored nodes.
    pub fn from_nodes(ruleset_id: RulesetId, nodes: Vec<DependencyNode>) -> Self {
        let mut subscribers: HashMap<AttributeId, Vec<ScriptId>> = HashMap::new();
        for node in &nodes {
            for attribute_id in &node.dependencies {
                let scripts = subscribers.entry(*attribute_id).or_default();
                if !scripts.contains(&node.script_id) {
                    scripts.push(node.script_id);
                }
            }
        }
        Self {
            ruleset_id,
            nodes,
            subscribers,
        }
    }

    pub fn ruleset_id(&self) -> RulesetId {
        self.ruleset_id
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn node(&self, script_id: ScriptId) -> Option<&DependencyNode> {
        self.nodes.iter().find(|node| node.script_id == script_id)
    }

    pub fn get_subscribers(&self, attribute_id: AttributeId) -> HashSet<ScriptId> {
        self.subscribers
            .get(&attribute_id)
            .map(|scripts| scripts.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn get_dependencies(&self, script_id: ScriptId) -> HashSet<AttributeId> {
        self.node(script_id)
            .map(|node| node.dependencies.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Subscribers of an attribute in script discovery order.
    pub fn get_execution_order(&self, attribute_id: AttributeId) -> Vec<ScriptId> {
        self.subscribers
            .get(&attribute_id)
            .cloned()
            .unwrap_or_default()
    }

    /// True when no script subscribes to anything.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Depth-first search over script -> owned attribute -> subscriber edges.
    pub fn detect_cycles(&self) -> CycleReport {
        let mut visited = HashSet::new();
        for node in &self.nodes {
            if visited.contains(&node.script_id) {
                continue;
            }
            let mut path = Vec::new();
            if let Some(cycle) = self.find_cycle(node.script_id, &mut path, &mut visited) {
                return CycleReport {
                    has_cycle: true,
                    cycle,
                };
            }
        }
        CycleReport::default()
    }

    fn find_cycle(
        &self,
        script_id: ScriptId,
        path: &mut Vec<ScriptId>,
        visited: &mut HashSet<ScriptId>,
    ) -> Option<Vec<ScriptId>> {
        if let Some(start) = path.iter().position(|id| *id == script_id) {
            let mut cycle = path[start..].to_vec();
            cycle.push(script_id);
            return Some(cycle);
        }
        if !visited.insert(script_id) {
            return None;
        }

        path.push(script_id);
        let owned = self.node(script_id).and_then(|node| node.owner_attribute);
        if let Some(attribute_id) = owned {
            for next in self.get_execution_order(attribute_id) {
                if let Some(cycle) = self.find_cycle(next, path, visited) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        None
    }
}
