//! Runtime limits read from the environment.
//!
//! Supported environment variables:
//! - QBSCRIPT_MAX_EXECUTIONS: scripts one cascade may run (default 100)
//! - QBSCRIPT_MAX_PER_SCRIPT: runs of one script within a cascade (default 10)
//! - QBSCRIPT_MAX_ACTION_DEPTH: nested action activations (default 8)
//! - QBSCRIPT_HALT_ON_SCRIPT_ERROR: stop a cascade at the first failing script (default false)
//! - QBSCRIPT_SEED: seed dice and random picks for reproducible runs (unset = entropy)

use std::str::FromStr;

use crate::qbscript::accessors::DEFAULT_MAX_ACTION_DEPTH;
use crate::reactive::execution_tracker::{
    ExecutionLimits, DEFAULT_MAX_EXECUTIONS, DEFAULT_MAX_PER_SCRIPT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub max_executions: usize,
    pub max_per_script: usize,
    pub max_action_depth: usize,
    pub halt_on_script_error: bool,
    pub seed: Option<u64>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            max_executions: DEFAULT_MAX_EXECUTIONS,
            max_per_script: DEFAULT_MAX_PER_SCRIPT,
            max_action_depth: DEFAULT_MAX_ACTION_DEPTH,
            halt_on_script_error: false,
            seed: None,
        }
    }
}

impl RuntimeSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup, falling back to defaults for
    /// missing or unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_executions: env_or(&lookup, "QBSCRIPT_MAX_EXECUTIONS", defaults.max_executions),
            max_per_script: env_or(&lookup, "QBSCRIPT_MAX_PER_SCRIPT", defaults.max_per_script),
            max_action_depth: env_or(
                &lookup,
                "QBSCRIPT_MAX_ACTION_DEPTH",
                defaults.max_action_depth,
            ),
            halt_on_script_error: env_or(
                &lookup,
                "QBSCRIPT_HALT_ON_SCRIPT_ERROR",
                defaults.halt_on_script_error,
            ),
            seed: lookup("QBSCRIPT_SEED").and_then(|raw| parse_logged("QBSCRIPT_SEED", &raw)),
        }
    }

    pub fn limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            max_executions: self.max_executions,
            max_per_script: self.max_per_script,
        }
    }
}

fn env_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|raw| parse_logged(key, &raw))
        .unwrap_or(default)
}

fn parse_logged<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}
