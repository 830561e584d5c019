//! Error types for the diff crate.

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A field name outside the comparable set.
    #[error("unknown diff field: {0:?}")]
    UnknownField(String),

    /// Candidate selection failed.
    #[error("registry error: {0}")]
    Registry(#[from] orgsync_registry::RegistryError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] orgsync_store::StoreError),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DiffError {
    /// Name of the offending input, for errors attributable to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField(_) => Some("field_names"),
            Self::Registry(e) => e.field(),
            _ => None,
        }
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
