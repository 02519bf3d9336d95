//! Error types for platform builds and platform definition files.

use std::path::PathBuf;

use omcfg_core::ModelError;

/// Errors that can occur while loading, validating or building a platform.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The object model rejected an operation during the build.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading platform files or directories.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Platform file not found.
    #[error("platform file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// No built-in platform has this name.
    #[error("unknown built-in platform '{name}'")]
    UnknownPlatform {
        /// The requested platform name.
        name: String,
    },

    /// The built graph lacks a value the CPU configuration needs.
    #[error("cannot read '{path}' from the built configuration: {detail}")]
    Extraction {
        /// Dotted path of the missing or malformed value.
        path: String,
        /// What was wrong with it.
        detail: String,
    },

    /// Validation error in a platform definition.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
