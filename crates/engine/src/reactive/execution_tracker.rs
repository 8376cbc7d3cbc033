//! Bounds reactive cascades.
//!
//! Each external trigger opens an [`ExecutionContext`]. Every script run in
//! the cascade is recorded against it; a record that would exceed the total
//! or per-script limit is refused and the cascade stops. Contexts live in a
//! concurrent map so independent cascades never contend on one lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize, Serializer};

use questbound_domain::{AttributeId, CharacterId, ExecutionId, ScriptId};

use crate::infrastructure::ports::ClockPort;

pub const DEFAULT_MAX_EXECUTIONS: usize = 100;
pub const DEFAULT_MAX_PER_SCRIPT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLimits {
    pub max_executions: usize,
    pub max_per_script: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_executions: DEFAULT_MAX_EXECUTIONS,
            max_per_script: DEFAULT_MAX_PER_SCRIPT,
        }
    }
}

/// State of one cascade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub character_id: CharacterId,
    pub trigger_attribute_id: Option<AttributeId>,
    /// Every script run, in order.
    pub execution_chain: Vec<ScriptId>,
    pub execution_count: BTreeMap<ScriptId, usize>,
    pub max_executions: usize,
    pub max_per_script: usize,
    pub start_time: DateTime<Utc>,
}

impl ExecutionContext {
    fn with_record(&self, script_id: ScriptId) -> Self {
        let mut next = self.clone();
        next.execution_chain.push(script_id);
        *next.execution_count.entry(script_id).or_insert(0) += 1;
        next
    }

    fn breached_limit(&self) -> Option<LimitType> {
        if self.execution_chain.len() > self.max_executions {
            return Some(LimitType::TotalLimit);
        }
        if self
            .execution_count
            .values()
            .any(|count| *count > self.max_per_script)
        {
            return Some(LimitType::PerScriptLimit);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    TotalLimit,
    PerScriptLimit,
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TotalLimit => write!(f, "total_limit"),
            Self::PerScriptLimit => write!(f, "per_script_limit"),
        }
    }
}

/// A refused record. `context` includes the refused script.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "Execution limit exceeded ({limit_type}) after {} script runs",
    .context.execution_chain.len()
)]
pub struct ExecutionLimitError {
    pub context: ExecutionContext,
    pub limit_type: LimitType,
}

impl ExecutionLimitError {
    pub fn report(&self) -> ExecutionLimitReport {
        ExecutionLimitReport {
            character_id: self.context.character_id,
            limit_type: self.limit_type,
            total_executions: self.context.execution_chain.len(),
            execution_chain: self.context.execution_chain.clone(),
            script_counts: self.context.execution_count.clone(),
        }
    }
}

/// Author-facing summary of a stopped cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLimitReport {
    pub character_id: CharacterId,
    pub limit_type: LimitType,
    pub total_executions: usize,
    pub execution_chain: Vec<ScriptId>,
    pub script_counts: BTreeMap<ScriptId, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub total_executions: usize,
    pub unique_scripts: usize,
    pub script_counts: BTreeMap<ScriptId, usize>,
    #[serde(rename = "elapsedTimeMs", serialize_with = "serialize_millis")]
    pub elapsed_time: Duration,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_milliseconds())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Limit(Box<ExecutionLimitError>),
    #[error("Unknown execution {0}")]
    UnknownExecution(ExecutionId),
}

pub struct ExecutionTracker {
    contexts: DashMap<ExecutionId, ExecutionContext>,
    clock: Arc<dyn ClockPort>,
}

impl ExecutionTracker {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            contexts: DashMap::new(),
            clock,
        }
    }

    pub fn start_execution(
        &self,
        character_id: CharacterId,
        trigger_attribute_id: Option<AttributeId>,
        limits: ExecutionLimits,
    ) -> ExecutionId {
        let execution_id = ExecutionId::new();
        self.contexts.insert(
            execution_id,
            ExecutionContext {
                execution_id,
                character_id,
                trigger_attribute_id,
                execution_chain: Vec::new(),
                execution_count: BTreeMap::new(),
                max_executions: limits.max_executions,
                max_per_script: limits.max_per_script,
                start_time: self.clock.now(),
            },
        );
        tracing::debug!(execution_id = %execution_id, character_id = %character_id, "Execution started");
        execution_id
    }

    /// Record one script run. A run that would breach a limit is refused and
    /// the stored context is left unchanged.
    pub fn record_execution(
        &self,
        execution_id: ExecutionId,
        script_id: ScriptId,
    ) -> Result<(), TrackerError> {
        let mut context = self
            .contexts
            .get_mut(&execution_id)
            .ok_or(TrackerError::UnknownExecution(execution_id))?;

        let next = context.with_record(script_id);
        if let Some(limit_type) = next.breached_limit() {
            tracing::warn!(
                execution_id = %execution_id,
                script_id = %script_id,
                limit = %limit_type,
                "Execution limit reached, stopping cascade"
            );
            return Err(TrackerError::Limit(Box::new(ExecutionLimitError {
                context: next,
                limit_type,
            })));
        }
        *context = next;
        Ok(())
    }

    pub fn get_stats(&self, execution_id: ExecutionId) -> Option<ExecutionStats> {
        let context = self.contexts.get(&execution_id)?;
        Some(ExecutionStats {
            total_executions: context.execution_chain.len(),
            unique_scripts: context.execution_count.len(),
            script_counts: context.execution_count.clone(),
            elapsed_time: self.clock.now() - context.start_time,
        })
    }

    pub fn end_execution(&self, execution_id: ExecutionId) -> Option<ExecutionContext> {
        self.contexts.remove(&execution_id).map(|(_, context)| context)
    }

    pub fn clear_all(&self) {
        self.contexts.clear();
    }

    pub fn is_active(&self, execution_id: ExecutionId) -> bool {
        self.contexts.contains_key(&execution_id)
    }

    pub fn get_active_executions(&self) -> Vec<ExecutionId> {
        let mut ids: Vec<ExecutionId> = self.contexts.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }
}
