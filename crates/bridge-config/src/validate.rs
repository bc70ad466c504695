use std::net::IpAddr;

use crate::config::Config;
use crate::error::ConfigError;

/// Validate a [`Config`], returning all detected violations.
///
/// Returns `Ok(())` when the config is valid, or `Err` with a
/// vector of every validation error found.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.attach.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            field: "attach.max_attempts".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    if config.attach.interval_ms == 0 {
        errors.push(ConfigError::Validation {
            field: "attach.interval_ms".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    if config.frontend.port_offset == 0 {
        errors.push(ConfigError::Validation {
            field: "frontend.port_offset".to_string(),
            message: "must not be 0: the frontend would collide with the debuggee port"
                .to_string(),
        });
    }

    if config.frontend.read_chunk_size == 0 {
        errors.push(ConfigError::Validation {
            field: "frontend.read_chunk_size".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    if !is_loopback_host(&config.frontend.host) {
        errors.push(ConfigError::Validation {
            field: "frontend.host".to_string(),
            message: format!("must be a loopback address, got `{}`", config.frontend.host),
        });
    }

    if config.session.source_extensions.is_empty()
        || config
            .session
            .source_extensions
            .iter()
            .any(|ext| ext.is_empty() || ext.starts_with('.'))
    {
        errors.push(ConfigError::Validation {
            field: "session.source_extensions".to_string(),
            message: "must list at least one extension, each without a leading dot".to_string(),
        });
    }

    if config.session.max_variable_children == 0 {
        errors.push(ConfigError::Validation {
            field: "session.max_variable_children".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `localhost` or a loopback IP literal.
fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
