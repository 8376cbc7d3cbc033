//! Use cases - user story orchestration over the runtime.

pub mod scripts;

pub use scripts::ScriptUseCases;
