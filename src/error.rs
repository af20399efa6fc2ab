//! Error types for the wisp host engine.

/// Top-level error type for the mini-app host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// App key/value document error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Reminder registry document error.
    #[error("registry error: {0}")]
    Registry(String),

    /// Deferred-callback scheduling error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Notification channel or delivery error.
    #[error("notification error: {0}")]
    Notification(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Host wire-contract error (envelope parse/validation).
    #[error("contract error: {0}")]
    Contract(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, HostError>;
