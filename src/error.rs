//! Error types for the gallery-acquire pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Scan errors (whole-scan fatal; per-item problems are SkipReasons)
    #[error("Cannot scan root '{path}': {reason}")]
    ScanRoot { path: PathBuf, reason: String },

    // Hash errors
    #[error("Hash generation failed: {0}")]
    Hash(String),

    // Remote source errors
    #[error("Remote source error: {0}")]
    Source(#[from] SourceError),

    // Fetch session errors
    #[error("A metadata fetch session is already running")]
    SessionBusy,

    // Download queue errors
    #[error("Download failed: {0}")]
    Download(String),

    // Watcher errors
    #[error("Filesystem watcher error: {0}")]
    Watch(#[from] notify::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes for the CLI.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const SOURCE_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const SCAN_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
}
