//! End-to-end tests for the script runtime.
//!
//! These tests drive the complete App over a [`MemoryStore`] loaded from the
//! Ranger demo ruleset (`demos/ranger.json`): scripts run, their buffered
//! updates are committed, and the committed change is propagated, exactly as
//! a host would do it.
//!
//! [`MemoryStore`]: crate::infrastructure::memory::MemoryStore

mod e2e_helpers;
mod entity_event_tests;
mod reactive_cascade_tests;

pub use e2e_helpers::*;
