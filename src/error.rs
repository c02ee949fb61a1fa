//! Error types for configuration and presentation.
//!
//! Tracing itself never fails: a miss is a background-colored result.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for fallible raytree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside the render loop
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be read
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        /// File that failed to load
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::config::TraceConfig`]
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration value out of range
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Frame presentation failed
    #[error("present error: {0}")]
    Present(String),
}
