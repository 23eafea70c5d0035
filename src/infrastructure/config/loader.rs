use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database url cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid gateway failure_streak_threshold: {0}. Must be at least 1")]
    InvalidFailureStreakThreshold(u32),

    #[error("Invalid scheduler tick_interval_ms: {0}. Must be at least 1")]
    InvalidTickInterval(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `.cortex/config.yaml` (project config)
    /// 3. `.cortex/local.yaml` (project local overrides, optional)
    /// 4. Environment variables (`CORTEX_` prefix, highest priority, `__` nesting separator)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".cortex/config.yaml"))
            .merge(Yaml::file(".cortex/local.yaml"))
            .merge(Env::prefixed("CORTEX_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, skipping the project-local chain.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.url.is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.gateway.failure_streak_threshold == 0 {
            return Err(ConfigError::InvalidFailureStreakThreshold(
                config.gateway.failure_streak_threshold,
            ));
        }

        if config.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval(config.scheduler.tick_interval_ms));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.database.url, "sqlite:.cortex/cortex.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
environment: production
gateway:
  failure_streak_threshold: 5
logging:
  level: debug
  format: pretty
";
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(figment::providers::Yaml::string(yaml))
            .extract()
            .expect("yaml should parse");

        assert_eq!(config.environment, "production");
        assert_eq!(config.gateway.failure_streak_threshold, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.is_ddl_locked_environment());

        ConfigLoader::validate(&config).expect("parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidLogLevel(level)) if level == "invalid"));
    }

    #[test]
    fn test_validate_empty_database_url() {
        let mut config = Config::default();
        config.database.url = String::new();

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::EmptyDatabaseUrl)));
    }

    #[test]
    fn test_validate_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidMaxConnections(0))));
    }

    #[test]
    fn test_validate_zero_failure_streak_threshold() {
        let mut config = Config::default();
        config.gateway.failure_streak_threshold = 0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ConfigError::InvalidFailureStreakThreshold(0))));
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("CORTEX_ENVIRONMENT", Some("staging")),
                ("CORTEX_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config: Config = Figment::new()
                    .merge(Serialized::defaults(Config::default()))
                    .merge(Env::prefixed("CORTEX_").split("__"))
                    .extract()
                    .unwrap();

                assert_eq!(config.environment, "staging");
                assert_eq!(config.logging.level, "debug");
                assert!(config.is_ddl_locked_environment());
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "environment: staging\nlogging:\n  level: info\n  format: json").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "environment: production\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.environment, "production", "override should win");
        assert_eq!(config.logging.level, "debug", "override should win for nested fields");
        assert_eq!(config.logging.format, "json", "base value should persist when not overridden");
    }
}
