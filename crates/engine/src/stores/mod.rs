//! In-memory state storage modules.
//!
//! Stores manage runtime state that doesn't belong in the database:
//! - `DependencyGraphStore` - built dependency graph snapshots per ruleset

pub mod dependency_graph;

pub use dependency_graph::DependencyGraphStore;
