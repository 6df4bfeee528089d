//! Core error types for the Kerb scanner.
//!
//! This module defines the central error type used across all subsystems.
//! Each subsystem error is represented as a variant for clear error propagation.

use thiserror::Error;

/// Central error type for all Kerb operations.
///
/// Each variant represents an error from a specific subsystem, allowing
/// for clear error propagation and handling across module boundaries.
/// The subsystem crates define their own structured error enums; embedding
/// applications that want a single error type convert into this one.
#[derive(Error, Debug)]
pub enum KerbError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Page rendering errors (navigation, browser launch)
    #[error("render error: {0}")]
    Render(String),

    /// Checker adapter errors (tool missing, tool crashed, bad output)
    #[error("checker error: {0}")]
    Checker(String),

    /// Crawl errors (traversal aborted, invalid start URL)
    #[error("crawl error: {0}")]
    Crawl(String),

    /// Job queue errors (capacity, unknown job, bad transition)
    #[error("queue error: {0}")]
    Queue(String),

    /// Scan orchestration errors
    #[error("scan error: {0}")]
    Scan(String),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors.
///
/// `InvalidValue` and `InvalidPattern` are the synchronous rejection path:
/// a scan configuration that fails validation never reaches the queue.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found (may be first run)
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// An include/exclude pattern failed to compile as a regular expression
    #[error("invalid URL pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern as supplied
        pattern: String,
        /// Compiler message
        reason: String,
    },
}

/// Result type alias using `KerbError`.
pub type Result<T> = std::result::Result<T, KerbError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
