use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("source reference must not be blank")]
    BlankSourceRef,

    #[error("invalid validation status: {0}")]
    InvalidStatus(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}
