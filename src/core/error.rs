//! Error types for seqtrace

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using seqtrace's Error
pub type Result<T> = std::result::Result<T, Error>;

/// seqtrace error types
///
/// Only configuration problems surface as errors. Gaps in the snapshot data
/// (unknown types, missing methods, unresolved callees) end a trace branch
/// and are logged instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Snapshot directory not found: {path}")]
    SnapshotDirNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
