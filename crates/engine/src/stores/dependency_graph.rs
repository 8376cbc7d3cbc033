//! Built dependency graphs, one snapshot per ruleset.
//!
//! A cascade clones the `Arc` and reads it without holding the lock, so a
//! rebuild never blocks or mutates a cascade already in flight.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use questbound_domain::RulesetId;

use crate::reactive::DependencyGraph;

/// Latest graph snapshot per ruleset.
pub struct DependencyGraphStore {
    inner: RwLock<HashMap<RulesetId, Arc<DependencyGraph>>>,
}

impl DependencyGraphStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, ruleset_id: RulesetId) -> Option<Arc<DependencyGraph>> {
        self.inner.read().await.get(&ruleset_id).cloned()
    }

    /// Replace the ruleset's snapshot and return the new handle.
    pub async fn insert(&self, graph: DependencyGraph) -> Arc<DependencyGraph> {
        let graph = Arc::new(graph);
        self.inner
            .write()
            .await
            .insert(graph.ruleset_id(), Arc::clone(&graph));
        graph
    }

    /// Drop a snapshot so the next cascade rebuilds it.
    pub async fn invalidate(&self, ruleset_id: RulesetId) -> bool {
        self.inner.write().await.remove(&ruleset_id).is_some()
    }
}

impl Default for DependencyGraphStore {
    fn default() -> Self {
        Self::new()
    }
}
