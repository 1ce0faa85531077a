//! Error types for the engine client, the chat session and config IO.

use std::path::PathBuf;

/// Errors talking to the engine over HTTP.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid engine payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors from the chat session.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("not connected to the engine")]
    NotConnected,
    #[error("question cannot be empty")]
    EmptyQuestion,
    #[error("unknown database: {0}")]
    UnknownDatabase(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Config load/save error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
