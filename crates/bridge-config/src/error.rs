use thiserror::Error;

/// Errors that can occur during configuration loading, parsing,
/// or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parsing failed.
    #[error("TOML parse error: {0}")]
    Parse(String),

    /// A config value failed validation.
    #[error("validation error: {field}: {message}")]
    Validation {
        /// The dotted field path (e.g. `attach.max_attempts`).
        field: String,
        /// Human-readable description of the violation.
        message: String,
    },

    /// An I/O error occurred while reading the config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
