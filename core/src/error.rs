use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Missing or malformed required input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The media provider failed or answered with a non-success status.
    #[error("{0}")]
    Upstream(String),

    /// The backing key-value store failed. Never retried.
    #[error("store error: {0}")]
    Store(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<sled::Error> for CatalogError {
    fn from(err: sled::Error) -> Self {
        CatalogError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Store(format!("codec: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
