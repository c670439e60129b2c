use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created with default settings.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Library / catalog errors
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Network request failed: {reason}")]
    Network { reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected {action}")]
    Rejected { action: String },

    // Playback errors
    #[error("No preview available for \"{title}\"")]
    NoPreviewAvailable { title: String },

    #[error("Playback rejected: {reason}")]
    PlaybackRejected { reason: String },

    #[error("Audio backend error: {reason}")]
    Backend { reason: String },

    #[error("Player is no longer running")]
    PlayerStopped,

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the error came from talking to a remote collaborator.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
