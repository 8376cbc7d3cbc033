//! Script use cases.
//!
//! Running scripts, delivering entity events, propagating attribute changes
//! and keeping the dependency graph current.

use std::sync::Arc;

use crate::infrastructure::ports::{DependencyGraphRepo, RulesetRepo, ScriptRepo};
use crate::reactive::{ExecutionLimits, ExecutionTracker};
use crate::stores::DependencyGraphStore;

mod build_graph;
mod entity_event;
mod error;
mod execute_script;
mod loader;
mod propagate;

#[cfg(test)]
pub(crate) mod test_support;

pub use build_graph::BuildDependencyGraph;
pub use entity_event::ExecuteEntityEvent;
pub use error::ScriptUseCaseError;
pub use execute_script::{ExecuteScript, ScriptExecutionResult};
pub use loader::RuntimeStateLoader;
pub use propagate::{PropagateAttributeChange, PropagationResult};

/// Container for script use cases.
pub struct ScriptUseCases {
    pub execute_script: Arc<ExecuteScript>,
    pub entity_events: Arc<ExecuteEntityEvent>,
    pub propagate: Arc<PropagateAttributeChange>,
    pub build_graph: Arc<BuildDependencyGraph>,
}

impl ScriptUseCases {
    /// Wire every script use case over the same ports and loader.
    pub fn wire(
        scripts: Arc<dyn ScriptRepo>,
        ruleset: Arc<dyn RulesetRepo>,
        graph_repo: Arc<dyn DependencyGraphRepo>,
        loader: Arc<RuntimeStateLoader>,
        tracker: Arc<ExecutionTracker>,
        graphs: Arc<DependencyGraphStore>,
        limits: ExecutionLimits,
        halt_on_script_error: bool,
    ) -> Self {
        let build_graph = Arc::new(BuildDependencyGraph::new(
            scripts.clone(),
            ruleset.clone(),
            graph_repo,
            graphs,
        ));
        let propagate = PropagateAttributeChange::new(build_graph.clone(), loader.clone(), tracker, limits)
            .halting_on_script_error(halt_on_script_error);
        Self {
            execute_script: Arc::new(ExecuteScript::new(scripts, loader.clone())),
            entity_events: Arc::new(ExecuteEntityEvent::new(ruleset, loader)),
            propagate: Arc::new(propagate),
            build_graph,
        }
    }
}
