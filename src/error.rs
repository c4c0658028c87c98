use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("path error: {0}")]
    Path(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(String),
    #[error("validation error: {0}")]
    Validation(String),
    /// Remote failures keep the bare message: it is shown as-is on the account card.
    #[error("{0}")]
    Provider(String),
    #[error("account not found")]
    AccountNotFound,
}

pub type Result<T> = std::result::Result<T, BackendError>;
