use thiserror::Error;

/// Everything the client can fail on. Callers at the command loop log these and move on.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} answered with status {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No current user; log in first")]
    NotAuthenticated,

    #[error("No chat selected")]
    NoChatSelected,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Cannot send a message to yourself")]
    SelfMessage,
}

impl ClientError {
    /// Precondition failures are rejected before any network call is made.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::NoChatSelected | Self::EmptyMessage | Self::SelfMessage
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
