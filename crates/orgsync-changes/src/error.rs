use orgsync_types::ProposalId;

use crate::proposal::ProposalStatus;

/// Errors produced by change proposal operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProposalError {
    #[error("change proposal not found: {0}")]
    NotFound(ProposalId),

    #[error("change proposal already exists: {0}")]
    Duplicate(ProposalId),

    /// The stored proposal left `expected` before the write landed.
    #[error("change proposal {id} is {actual}, expected {expected}")]
    StatusConflict {
        id: ProposalId,
        expected: ProposalStatus,
        actual: ProposalStatus,
    },

    /// A field name outside the editable set.
    #[error("unknown proposal field: {0:?}")]
    UnknownField(String),

    #[error("proposal store lock poisoned")]
    LockPoisoned,
}

impl ProposalError {
    /// The offending field name, when the error is attributable to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField(name) => Some(name),
            _ => None,
        }
    }
}

/// Result alias for proposal operations.
pub type ProposalResult<T> = Result<T, ProposalError>;
