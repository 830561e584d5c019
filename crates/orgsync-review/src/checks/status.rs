use orgsync_changes::ProposalStatus;

use crate::check::{CheckContext, CheckDecision, ReviewCheck, ReviewRequest};
use crate::error::ReviewError;

/// State machine check: `NEW` is the only reviewable state.
pub struct StatusCheck;

impl ReviewCheck for StatusCheck {
    fn name(&self) -> &str {
        "status"
    }

    fn evaluate(&self, request: &ReviewRequest<'_>, _context: &CheckContext<'_>) -> CheckDecision {
        let proposal = request.proposal;
        if proposal.status != ProposalStatus::New {
            return CheckDecision::Fail(ReviewError::StateConflict {
                proposal: proposal.id,
                status: proposal.status,
            });
        }
        CheckDecision::Pass
    }
}
