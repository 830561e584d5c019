//! Error types for registry operations.

use orgsync_store::StoreError;
use orgsync_types::{DataSourceId, VersionId};
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The data source was not found.
    #[error("data source not found: {0}")]
    DataSourceNotFound(DataSourceId),

    /// The version was not found.
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// A data source with this name already exists.
    #[error("data source already exists: {name}")]
    DataSourceExists { name: String },

    /// The data source name is invalid.
    #[error("invalid data source name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The version belongs to another data source.
    #[error("{version} does not belong to {data_source}")]
    ForeignVersion {
        version: VersionId,
        data_source: DataSourceId,
    },

    /// Two versions from different data sources cannot be compared.
    #[error("{a} and {b} belong to different data sources")]
    DifferentDataSources { a: VersionId, b: VersionId },

    /// A version cannot be compared with itself.
    #[error("{0} cannot be compared with itself")]
    SameVersion(VersionId),

    /// A filter references an org unit or group outside the filtered version.
    #[error("filter {filter} references a record outside {version}")]
    FilterOutsideVersion {
        filter: &'static str,
        version: VersionId,
    },

    /// Error from the underlying tree store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry lock poisoned")]
    LockPoisoned,
}

impl RegistryError {
    /// Name of the offending input, for errors attributable to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidName { .. } | Self::DataSourceExists { .. } => Some("name"),
            Self::FilterOutsideVersion { filter, .. } => Some(*filter),
            _ => None,
        }
    }
}

/// Convenience type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
