//! Configuration loading from disk and environment.

use std::path::Path;
use std::fs;
use thiserror::Error;

use crate::config::schema::McpConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `sessions.ttl_secs`.
pub const SESSION_TTL_ENV_VAR: &str = "CELO_MCP_SESSION_TTL_SECS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<McpConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: McpConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the effective configuration.
///
/// Reads `path` if given, otherwise starts from defaults, then applies
/// environment overrides and validates the result.
pub fn resolve_config(path: Option<&Path>) -> Result<McpConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => McpConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn apply_env_overrides(
    config: &mut McpConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(value) = lookup(SESSION_TTL_ENV_VAR) {
        config.sessions.ttl_secs = value.trim().parse().map_err(|_| ConfigError::Env {
            var: SESSION_TTL_ENV_VAR,
            value,
        })?;
    }
    Ok(())
}
