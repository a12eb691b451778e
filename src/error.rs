//! Error types for startup, configuration and seeking

use std::path::PathBuf;

/// Fatal errors raised before playback state exists.
///
/// Every variant maps to exit status 1 in the CLI.
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    /// Wrong command line usage
    #[error("{0}")]
    Usage(String),

    /// Invalid or unreadable configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Audio file could not be opened
    #[error("Error while opening file {path}: {source}")]
    Open {
        /// Path given on the command line
        path: PathBuf,
        /// Underlying filesystem error
        #[source]
        source: std::io::Error,
    },

    /// Audio file could not be probed or decoded
    #[error("Error while decoding audio file: {0}")]
    Decode(String),

    /// Audio output device could not be initialised or started
    #[error("Error while initialising the audio device: {0}")]
    AudioInit(String),

    /// Terminal screen could not be initialised
    #[error("Error while initialising the screen: {0}")]
    DisplayInit(#[source] std::io::Error),
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// The decoded stream rejected a reposition request.
///
/// Recoverable: the caller logs it and playback continues from wherever the
/// stream ended up.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Error while changing song position to sample {target}: {reason}")]
pub struct SeekError {
    /// Requested sample offset
    pub target: u64,
    /// Reason reported by the stream
    pub reason: String,
}

impl SeekError {
    /// Create a seek error for `target`.
    pub fn new(target: u64, reason: impl Into<String>) -> Self {
        Self {
            target,
            reason: reason.into(),
        }
    }
}

/// Configuration file problems.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for [`crate::PlayerConfig`]
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range
    #[error("{0}")]
    Invalid(String),
}
