//! Error types for the remote session.

use thiserror::Error;

/// Errors that can occur while talking to the remote playback endpoint.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Command issued without a live session
    #[error("Not connected to remote player")]
    NotConnected,

    /// Session could not be opened
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Transport-level failure (command or subscription)
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Endpoint returned an error response
    #[error("Remote error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Access token missing, invalid, or expired
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Rate limited by endpoint
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Endpoint offline or unreachable
    #[error("Remote endpoint unreachable: {0}")]
    Unreachable(String),

    /// Invalid endpoint URL
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse endpoint response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Operation cancelled before completion
    #[error("Operation cancelled")]
    Cancelled,
}

impl RemoteError {
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for remote session operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
