use std::path::Path;

use crate::config::Config;
use crate::error::ConfigError;
use crate::validate::validate;

/// Load configuration from an optional TOML file.
///
/// * `None` → built-in defaults.
/// * `Some(path)` that does not exist → built-in defaults, logged.
/// * `Some(path)` that exists → parsed and validated.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O failure, parse failure, or
/// validation failure.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = load_from_str(&content)?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Parse a TOML string directly into a validated [`Config`].
///
/// # Errors
///
/// Returns [`ConfigError`] on parse or validation failure.
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate(&config).map_err(|errors| {
        errors
            .into_iter()
            .next()
            .unwrap_or_else(|| ConfigError::Validation {
                field: "unknown".to_string(),
                message: "validation failed".to_string(),
            })
    })?;

    Ok(config)
}
