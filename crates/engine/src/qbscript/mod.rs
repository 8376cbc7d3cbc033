//! QBScript: the embedded scripting language ruleset authors attach to
//! attributes, items, actions and archetypes.
//!
//! Source flows through [`lexer`] and [`parser`] into an AST that the
//! [`evaluator`] walks against a [`RuntimeState`]. The [`analyzer`] reads
//! the same AST statically to discover subscriptions and event handlers.

pub mod accessors;
pub mod analyzer;
pub mod ast;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod runner;
pub mod token;
pub mod value;

pub use accessors::{
    CharacterSheet, PendingUpdate, PendingUpdates, RulesetCache, RuntimeState, ScriptBindings,
};
pub use analyzer::{analyze_script, extract_event_handlers, extract_subscriptions, ScriptAnalysis};
pub use error::{EvaluationError, LexError, ParseError, ScriptError, ScriptErrorReport};
pub use evaluator::Evaluator;
pub use lexer::{tokenize, tokenize_partial};
pub use parser::{parse, parse_source};
pub use runner::run_script;
pub use value::Value;
