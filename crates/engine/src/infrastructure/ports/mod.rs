//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Ruleset and character storage (in-memory today, any database tomorrow)
//! - Dependency graph persistence
//! - Dice rolling (a host may animate or prompt)
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

pub use error::{DiceError, RepoError};
pub use external::DiceRollerPort;
pub use repos::{CharacterRepo, DependencyGraphRepo, RulesetRepo, ScriptFilter, ScriptRepo};
pub use testing::{ClockPort, RandomPort};

#[cfg(test)]
pub use external::MockDiceRollerPort;
#[cfg(test)]
pub use repos::{MockCharacterRepo, MockDependencyGraphRepo, MockRulesetRepo, MockScriptRepo};
#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};
