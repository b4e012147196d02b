//! Structured error types for querytap
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

/// Problems with the configuration surface, reported before any ingestion.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid server port: {0}")]
    InvalidPort(u16),

    #[error("Output format is empty (placeholders: #s source, #i source ip, #r route, #q query)")]
    EmptyFormat,

    #[error("Display count must be at least 1")]
    ZeroDisplayCount,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to spawn {program}: {error}")]
    SpawnFailed { program: String, error: std::io::Error },

    #[error("Failed to open capture file {path}: {error}")]
    OpenFailed { path: String, error: std::io::Error },

    #[error("Not a legacy pcap stream: {0}")]
    NotPcap(String),

    #[error("pcap parse error: {0}")]
    ParseFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
