use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Timed out waiting for a reply to {0:?}")]
    ReplyTimeout(String),

    #[error("Unexpected reply to {command:?}: {reply:?}")]
    UnexpectedResponse { command: String, reply: String },

    #[error("Unknown command: {0:?}")]
    InvalidCommand(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
