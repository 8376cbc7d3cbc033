//! Build dependency graph use case.
//!
//! Graphs are never patched. Any script or attribute edit calls
//! [`BuildDependencyGraph::rebuild`], which analyzes the whole ruleset again
//! and swaps the snapshot; cascades already running keep the old one.

use std::sync::Arc;

use questbound_domain::RulesetId;

use crate::infrastructure::ports::{DependencyGraphRepo, RulesetRepo, ScriptFilter, ScriptRepo};
use crate::reactive::DependencyGraph;
use crate::stores::DependencyGraphStore;

use super::error::ScriptUseCaseError;

pub struct BuildDependencyGraph {
    scripts: Arc<dyn ScriptRepo>,
    ruleset: Arc<dyn RulesetRepo>,
    graph_repo: Arc<dyn DependencyGraphRepo>,
    graphs: Arc<DependencyGraphStore>,
}

impl BuildDependencyGraph {
    pub fn new(
        scripts: Arc<dyn ScriptRepo>,
        ruleset: Arc<dyn RulesetRepo>,
        graph_repo: Arc<dyn DependencyGraphRepo>,
        graphs: Arc<DependencyGraphStore>,
    ) -> Self {
        Self {
            scripts,
            ruleset,
            graph_repo,
            graphs,
        }
    }

    /// Analyze every enabled script of the ruleset.
    pub async fn build_graph(&self, ruleset_id: RulesetId) -> Result<DependencyGraph, ScriptUseCaseError> {
        let (scripts, attributes) = tokio::try_join!(
            self.scripts.list_scripts(ruleset_id, ScriptFilter::enabled()),
            self.ruleset.list_attributes(ruleset_id),
        )?;
        let graph = DependencyGraph::build(ruleset_id, &scripts, &attributes);

        let cycles = graph.detect_cycles();
        if cycles.has_cycle {
            let chain: Vec<String> = cycles.cycle.iter().map(ToString::to_string).collect();
            tracing::warn!(
                ruleset_id = %ruleset_id,
                cycle = %chain.join(" -> "),
                "Dependency graph contains a cycle; cascades will stop at the execution limit"
            );
        }
        Ok(graph)
    }

    /// Persist the analyzed nodes, replacing what was stored for the ruleset.
    pub async fn save_to_database(&self, graph: &DependencyGraph) -> Result<(), ScriptUseCaseError> {
        self.graph_repo
            .save_nodes(graph.ruleset_id(), graph.nodes().to_vec())
            .await?;
        Ok(())
    }

    /// Build, persist and publish a fresh snapshot.
    pub async fn rebuild(&self, ruleset_id: RulesetId) -> Result<Arc<DependencyGraph>, ScriptUseCaseError> {
        let graph = self.build_graph(ruleset_id).await?;
        self.save_to_database(&graph).await?;
        let nodes = graph.nodes().len();
        let graph = self.graphs.insert(graph).await;
        tracing::info!(ruleset_id = %ruleset_id, nodes, "Dependency graph rebuilt");
        Ok(graph)
    }

    /// Restore the last saved graph without re-analyzing scripts.
    pub async fn load_saved(&self, ruleset_id: RulesetId) -> Result<Arc<DependencyGraph>, ScriptUseCaseError> {
        let nodes = self.graph_repo.load_nodes(ruleset_id).await?;
        Ok(self
            .graphs
            .insert(DependencyGraph::from_nodes(ruleset_id, nodes))
            .await)
    }

    /// The current snapshot, building one on first use.
    pub async fn snapshot(&self, ruleset_id: RulesetId) -> Result<Arc<DependencyGraph>, ScriptUseCaseError> {
        match self.graphs.get(ruleset_id).await {
            Some(graph) => Ok(graph),
            None => self.rebuild(ruleset_id).await,
        }
    }
}
