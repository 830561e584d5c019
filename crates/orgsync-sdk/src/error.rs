use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid log level: {0:?}")]
    InvalidLogLevel(String),

    #[error("store error: {0}")]
    Store(#[from] orgsync_store::StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] orgsync_registry::RegistryError),

    #[error("diff error: {0}")]
    Diff(#[from] orgsync_diff::DiffError),

    #[error("proposal error: {0}")]
    Proposal(#[from] orgsync_changes::ProposalError),

    #[error(transparent)]
    Sync(#[from] orgsync_sync::SyncError),

    #[error(transparent)]
    Review(#[from] orgsync_review::ReviewError),
}

impl SdkError {
    /// The request field the error is attributable to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Registry(e) => e.field(),
            Self::Diff(e) => e.field(),
            Self::Proposal(e) => e.field(),
            Self::Sync(e) => e.field(),
            Self::Review(e) => e.field(),
            _ => None,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
