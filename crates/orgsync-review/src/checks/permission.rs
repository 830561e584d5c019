use crate::check::{CheckContext, CheckDecision, ReviewCheck, ReviewRequest};
use crate::error::ReviewError;

pub struct PermissionCheck;

impl ReviewCheck for PermissionCheck {
    fn name(&self) -> &str {
        "permission"
    }

    fn evaluate(&self, request: &ReviewRequest<'_>, context: &CheckContext<'_>) -> CheckDecision {
        if context.permission.may_review(request.actor, request.proposal) {
            CheckDecision::Pass
        } else {
            CheckDecision::Fail(ReviewError::PermissionDenied {
                actor: request.actor,
            })
        }
    }
}
