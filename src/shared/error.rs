use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote call failed: {0}")]
    RemoteFailure(String),

    #[error("Operation already in flight: {0}")]
    Busy(String),

    #[error("Malformed change event: {0}")]
    MalformedEvent(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller may retry the operation unchanged.
    /// Retry policy itself lives in the UI layer, not here.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::RemoteFailure(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedEvent(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::RemoteFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
