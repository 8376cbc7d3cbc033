//! Infrastructure implementations.
//!
//! Contains port traits and the adapters that implement them.

pub mod clock;
pub mod dice;
pub mod memory;
pub mod ports;
pub mod settings;
