//! # Configuration Loader
//!
//! Unified configuration loading from embedded defaults, an optional user
//! file, and environment variables. Layered in that order so later
//! sources override earlier ones.

use std::path::Path;

use config::{Config as ConfigBuilder, Environment, FileFormat};
use validator::Validate;

use crate::domain::error::{Error, Result};

use super::types::Config;

/// Embedded default configuration. Compiled into the binary so a
/// fresh install has sane values even with no config file present.
const DEFAULT_CONFIG_TOML: &str = include_str!("../../../config/default.toml");

/// Returns the embedded default config TOML, exposed for tests that
/// verify the defaults parse and validate.
pub fn default_config_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}

/// Loads configuration from embedded defaults, an optional file, and
/// `CODE_SEARCH__`-prefixed environment variables (`__` nests fields,
/// e.g. `CODE_SEARCH__MAX_CONCURRENT_INDEXERS=4`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Create a new loader.
    pub fn new() -> Self {
        Self
    }

    /// Load embedded defaults and environment overrides only, skipping
    /// any on-disk user config.
    pub fn load(&self) -> Result<Config> {
        self.build(None)
    }

    /// Load embedded defaults, then `path` if it exists, then
    /// environment overrides.
    pub fn load_with_file(&self, path: &Path) -> Result<Config> {
        self.build(Some(path))
    }

    /// Load only the embedded defaults, with no file or environment
    /// layer. Used by tests to verify the shipped defaults are valid on
    /// their own.
    pub fn load_embedded_defaults_only(&self) -> Result<Config> {
        let built = ConfigBuilder::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG_TOML, FileFormat::Toml))
            .build()?;
        Self::finish(built)
    }

    fn build(&self, path: Option<&Path>) -> Result<Config> {
        let mut builder = ConfigBuilder::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG_TOML, FileFormat::Toml));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("CODE_SEARCH")
                .separator("__")
                .try_parsing(true),
        );

        Self::finish(builder.build()?)
    }

    fn finish(built: config::Config) -> Result<Config> {
        let config: Config = built.try_deserialize()?;
        config
            .validate()
            .map_err(|e| Error::config(format!("configuration validation failed: {e}")))?;
        config
            .validate_chunk_window()
            .map_err(|e| Error::config(format!("configuration validation failed: {e}")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_validate() {
        let config = ConfigLoader::new()
            .load_embedded_defaults_only()
            .expect("embedded defaults should be valid");
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.chunk_overlap, 10);
    }

    #[test]
    fn missing_user_file_falls_back_to_defaults() {
        let config = ConfigLoader::new()
            .load_with_file(Path::new("/nonexistent/config.toml"))
            .expect("missing file is not required");
        assert_eq!(config.max_concurrent_indexers, 1);
    }

    #[test]
    fn user_file_overrides_embedded_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_concurrent_indexers = 7\n").expect("write config");

        let config = ConfigLoader::new()
            .load_with_file(&path)
            .expect("load with file");
        assert_eq!(config.max_concurrent_indexers, 7);
        assert_eq!(config.chunk_size, 50, "unrelated defaults are preserved");
    }
}
