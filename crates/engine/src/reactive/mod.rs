//! Reactive propagation: which scripts depend on which attributes, and how
//! far a single change may ripple.

pub mod cascade;
pub mod dependency_graph;
pub mod execution_tracker;

pub use cascade::{run_cascade, CascadeOutcome, CascadeRequest, ScriptFailure};
pub use dependency_graph::{CycleReport, DependencyGraph, DependencyNode};
pub use execution_tracker::{
    ExecutionContext, ExecutionLimitError, ExecutionLimitReport, ExecutionLimits, ExecutionStats,
    ExecutionTracker, LimitType, TrackerError,
};
