use orgsync_changes::ProposalError;
use orgsync_diff::DiffError;
use orgsync_registry::RegistryError;
use orgsync_store::StoreError;
use orgsync_types::{SynchronizationId, VersionId};
use thiserror::Error;

/// Misconfigured synchronization requests. Fatal and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{to_update} and {compare_with} belong to different data sources")]
    DifferentDataSources {
        to_update: VersionId,
        compare_with: VersionId,
    },

    #[error("{0} cannot be synchronized with itself")]
    SameVersion(VersionId),

    #[error("synchronization {0} has no diff; create the diff first")]
    DiffMissing(SynchronizationId),

    #[error("synchronization {0} was already applied")]
    AlreadySynchronized(SynchronizationId),

    /// The diff no longer describes the versions; recreate it.
    #[error("diff entry {source_ref} is stale: {reason}")]
    StaleDiff {
        source_ref: String,
        reason: &'static str,
    },

    #[error("filter {filter} references a record outside {version}")]
    FilterOutsideVersion {
        filter: &'static str,
        version: VersionId,
    },
}

impl ConfigError {
    /// The synchronization field the error is attributable to.
    pub fn field(&self) -> Option<&str> {
        Some(match self {
            Self::DifferentDataSources { .. } | Self::SameVersion(_) => {
                "source_version_to_compare_with"
            }
            Self::DiffMissing(_) | Self::StaleDiff { .. } => "json_diff",
            Self::AlreadySynchronized(_) => "synchronized_at",
            Self::FilterOutsideVersion { filter, .. } => *filter,
        })
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("synchronization not found: {0}")]
    NotFound(SynchronizationId),

    #[error("registry error: {0}")]
    Registry(RegistryError),

    #[error("diff error: {0}")]
    Diff(DiffError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("proposal error: {0}")]
    Proposal(#[from] ProposalError),

    #[error("synchronization store lock poisoned")]
    LockPoisoned,
}

impl SyncError {
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Config(e) => e.field(),
            Self::Registry(e) => e.field(),
            Self::Diff(e) => e.field(),
            Self::Proposal(e) => e.field(),
            _ => None,
        }
    }
}

/// Registry failures that describe a bad request surface as configuration
/// errors.
impl From<RegistryError> for SyncError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DifferentDataSources { a, b } => {
                ConfigError::DifferentDataSources {
                    to_update: a,
                    compare_with: b,
                }
                .into()
            }
            RegistryError::SameVersion(v) => ConfigError::SameVersion(v).into(),
            RegistryError::FilterOutsideVersion { filter, version } => {
                ConfigError::FilterOutsideVersion { filter, version }.into()
            }
            RegistryError::Store(e) => Self::Store(e),
            other => Self::Registry(other),
        }
    }
}

impl From<DiffError> for SyncError {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::Registry(e) => e.into(),
            DiffError::Store(e) => Self::Store(e),
            other => Self::Diff(other),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
