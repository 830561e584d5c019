use std::collections::BTreeSet;

use orgsync_changes::{ChangeProposal, ProposalField};
use orgsync_types::UserId;

use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::permission::ReviewPermission;

// ---------------------------------------------------------------------------
// ReviewAction
// ---------------------------------------------------------------------------

/// What a reviewer wants to do with a proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewAction {
    Approve { fields: BTreeSet<ProposalField> },
    Reject { comment: String },
}

impl ReviewAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
        }
    }
}

// ---------------------------------------------------------------------------
// ReviewRequest
// ---------------------------------------------------------------------------

/// One review decision, evaluated by the check pipeline before any write.
#[derive(Clone, Debug)]
pub struct ReviewRequest<'a> {
    pub proposal: &'a ChangeProposal,
    pub action: ReviewAction,
    pub actor: Option<UserId>,
}

// ---------------------------------------------------------------------------
// CheckDecision
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum CheckDecision {
    Pass,
    /// The request is refused; the error names the offending field.
    Fail(ReviewError),
}

impl CheckDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Recorded outcome of one check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub check_name: String,
    pub passed: bool,
}

// ---------------------------------------------------------------------------
// CheckContext
// ---------------------------------------------------------------------------

/// Shared state available to every check.
pub struct CheckContext<'a> {
    pub config: &'a ReviewConfig,
    pub permission: &'a dyn ReviewPermission,
}

// ---------------------------------------------------------------------------
// ReviewCheck trait
// ---------------------------------------------------------------------------

/// A single check in the review pipeline.
///
/// Object-safe and `Send + Sync` so checks can live in a
/// `Vec<Box<dyn ReviewCheck>>`.
pub trait ReviewCheck: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, request: &ReviewRequest<'_>, context: &CheckContext<'_>) -> CheckDecision;
}
