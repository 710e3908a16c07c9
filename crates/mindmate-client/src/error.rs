use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The gateway refused the handshake (`connect_error`).
    #[error("relay authentication failed: {0}")]
    AuthRejected(String),

    /// REST answered 401/403; the session token is no longer usable.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Whether the caller should discard its session and log in again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthRejected(_) | Self::Unauthorized(_))
    }
}
