//! Common utility functions shared across the domain and engine.
//!
//! Pure functions only - no side effects, no I/O.

pub mod string;

pub use string::{normalize_title, titles_match};
