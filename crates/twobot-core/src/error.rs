use thiserror::Error;

/// Top-level error type for twobot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Transport-level failure talking to the chat platform.
    #[error("platform error: {0}")]
    Platform(String),

    /// The platform answered with a non-success status.
    #[error("platform rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Still rate limited after the transport gave up retrying.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Settings store error.
    #[error("store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
