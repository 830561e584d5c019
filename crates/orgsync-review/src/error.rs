use orgsync_changes::{ProposalError, ProposalStatus};
use orgsync_store::StoreError;
use orgsync_types::{OrgUnitId, ProposalId, UserId};

/// Errors raised by the review workflow.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Only `NEW` proposals can be approved or rejected.
    #[error("proposal {proposal} is {status}, only NEW proposals can be reviewed")]
    StateConflict {
        proposal: ProposalId,
        status: ProposalStatus,
    },

    /// A field name outside the editable set.
    #[error("unknown field {field:?}")]
    InvalidField { field: String },

    #[error("field {field} was not requested by the proposal")]
    FieldNotRequested { field: &'static str },

    #[error("a {field} is required")]
    MissingComment { field: &'static str },

    #[error("approval must approve at least one field")]
    NoFieldsApproved,

    #[error("change request must request at least one field")]
    NoFieldsRequested,

    #[error("user {actor:?} may not review proposals")]
    PermissionDenied { actor: Option<UserId> },

    #[error("change proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("org unit not found: {0}")]
    OrgUnitMissing(OrgUnitId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("proposal error: {0}")]
    Proposal(#[from] ProposalError),

    #[error("audit error: {0}")]
    Audit(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReviewError {
    /// The request field the error is attributable to.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::StateConflict { .. } => Some("status"),
            Self::InvalidField { field } => Some(field),
            Self::FieldNotRequested { field } => Some(field),
            Self::MissingComment { field } => Some(field),
            Self::NoFieldsApproved => Some("approved_fields"),
            Self::NoFieldsRequested => Some("requested_fields"),
            Self::Proposal(e) => e.field(),
            _ => None,
        }
    }

    /// Errors a reviewer can trigger in normal use, as opposed to storage
    /// failures.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::StateConflict { .. }
                | Self::InvalidField { .. }
                | Self::FieldNotRequested { .. }
                | Self::MissingComment { .. }
                | Self::NoFieldsApproved
                | Self::NoFieldsRequested
                | Self::PermissionDenied { .. }
        )
    }
}

pub type ReviewResult<T> = Result<T, ReviewError>;
