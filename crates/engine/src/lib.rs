//! Quest Bound Engine library.
//!
//! This crate contains the QBScript runtime for Quest Bound rulesets.
//!
//! ## Structure
//!
//! - `qbscript/` - Lexer, parser, evaluator, accessors and static analysis
//! - `reactive/` - Dependency graph, execution tracker and cascades
//! - `use_cases/` - Script execution, entity events, propagation, graph rebuilds
//! - `stores/` - In-memory runtime state (graph snapshots)
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod qbscript;
pub mod reactive;
pub mod stores;
pub mod use_cases;

/// End-to-end cascades through the in-memory store.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
