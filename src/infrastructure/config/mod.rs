//! Layered configuration: embedded defaults, user file, environment.

/// Loading and layering of configuration sources.
pub mod loader;
/// The `Config` struct and its validation rules.
pub mod types;

pub use loader::ConfigLoader;
pub use types::Config;
