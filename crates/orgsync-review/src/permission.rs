use std::collections::BTreeSet;

use orgsync_changes::ChangeProposal;
use orgsync_types::UserId;

/// Answers whether a user may review a proposal.
pub trait ReviewPermission: Send + Sync {
    fn may_review(&self, actor: Option<UserId>, proposal: &ChangeProposal) -> bool;
}

/// Everyone may review, including anonymous callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl ReviewPermission for AllowAll {
    fn may_review(&self, _actor: Option<UserId>, _proposal: &ChangeProposal) -> bool {
        true
    }
}

/// Only the listed users may review.
#[derive(Clone, Debug, Default)]
pub struct AllowList {
    reviewers: BTreeSet<UserId>,
}

impl AllowList {
    pub fn new(reviewers: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            reviewers: reviewers.into_iter().collect(),
        }
    }
}

impl ReviewPermission for AllowList {
    fn may_review(&self, actor: Option<UserId>, _proposal: &ChangeProposal) -> bool {
        actor.is_some_and(|user| self.reviewers.contains(&user))
    }
}
