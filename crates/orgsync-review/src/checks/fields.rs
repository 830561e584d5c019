use crate::check::{CheckContext, CheckDecision, ReviewAction, ReviewCheck, ReviewRequest};
use crate::error::ReviewError;

/// Validates the approved field set or the rejection comment against the
/// review configuration.
pub struct FieldCheck;

impl ReviewCheck for FieldCheck {
    fn name(&self) -> &str {
        "fields"
    }

    fn evaluate(&self, request: &ReviewRequest<'_>, context: &CheckContext<'_>) -> CheckDecision {
        let config = context.config;
        match &request.action {
            ReviewAction::Approve { fields } => {
                if fields.is_empty() && !config.allow_empty_approval {
                    return CheckDecision::Fail(ReviewError::NoFieldsApproved);
                }
                if config.restrict_to_requested_fields {
                    let requested = &request.proposal.requested_fields;
                    if let Some(field) = fields.iter().find(|f| !requested.contains(f)) {
                        return CheckDecision::Fail(ReviewError::FieldNotRequested {
                            field: field.as_str(),
                        });
                    }
                }
            }
            ReviewAction::Reject { comment } => {
                if config.require_rejection_comment && comment.trim().is_empty() {
                    return CheckDecision::Fail(ReviewError::MissingComment {
                        field: "rejection_comment",
                    });
                }
            }
        }
        CheckDecision::Pass
    }
}
