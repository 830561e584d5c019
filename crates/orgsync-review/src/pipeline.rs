use tracing::debug;

use crate::check::{CheckContext, CheckDecision, CheckResult, ReviewCheck, ReviewRequest};
use crate::checks::{FieldCheck, PermissionCheck, StatusCheck};
use crate::config::ReviewConfig;
use crate::error::ReviewResult;
use crate::permission::ReviewPermission;

/// An ordered pipeline of checks every review request must pass before the
/// workflow writes anything.
pub struct ReviewPipeline {
    checks: Vec<Box<dyn ReviewCheck>>,
    config: ReviewConfig,
}

impl ReviewPipeline {
    /// Empty pipeline. Use [`Self::add_check`] or
    /// [`Self::with_default_checks`].
    pub fn new(config: ReviewConfig) -> Self {
        Self {
            checks: Vec::new(),
            config,
        }
    }

    /// Status -> Fields -> Permission
    pub fn with_default_checks(config: ReviewConfig) -> Self {
        let mut pipeline = Self::new(config);
        pipeline.add_check(Box::new(StatusCheck));
        pipeline.add_check(Box::new(FieldCheck));
        pipeline.add_check(Box::new(PermissionCheck));
        pipeline
    }

    pub fn add_check(&mut self, check: Box<dyn ReviewCheck>) {
        self.checks.push(check);
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    /// Run every check in order. Fail-fast: the first failing check's error
    /// is returned and later checks do not run.
    pub fn evaluate(
        &self,
        request: &ReviewRequest<'_>,
        permission: &dyn ReviewPermission,
    ) -> ReviewResult<Vec<CheckResult>> {
        let context = CheckContext {
            config: &self.config,
            permission,
        };
        let mut results = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            match check.evaluate(request, &context) {
                CheckDecision::Pass => results.push(CheckResult {
                    check_name: check.name().to_string(),
                    passed: true,
                }),
                CheckDecision::Fail(err) => {
                    debug!(
                        check = check.name(),
                        proposal = %request.proposal.id,
                        action = request.action.name(),
                        error = %err,
                        "review check failed"
                    );
                    return Err(err);
                }
            }
        }
        Ok(results)
    }
}
