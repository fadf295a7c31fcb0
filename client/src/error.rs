use shared::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("server is full")]
    ServerFull,

    #[error("server closed the connection")]
    Disconnected,

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
