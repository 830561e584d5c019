use orgsync_types::{OrgUnitId, ProposalId, SynchronizationId};

use crate::error::ProposalResult;
use crate::proposal::{ChangeProposal, ProposalStatus};

/// Criteria for listing proposals. Unset criteria match everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProposalQuery {
    pub org_unit: Option<OrgUnitId>,
    pub synchronization: Option<SynchronizationId>,
    pub status: Option<ProposalStatus>,
}

impl ProposalQuery {
    pub fn for_org_unit(org_unit: OrgUnitId) -> Self {
        Self {
            org_unit: Some(org_unit),
            ..Self::default()
        }
    }

    pub fn for_synchronization(synchronization: SynchronizationId) -> Self {
        Self {
            synchronization: Some(synchronization),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: ProposalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, proposal: &ChangeProposal) -> bool {
        self.org_unit.map_or(true, |id| proposal.org_unit == id)
            && self
                .synchronization
                .map_or(true, |id| proposal.synchronization == Some(id))
            && self.status.map_or(true, |s| proposal.status == s)
    }
}

/// Write boundary for proposal storage.
pub trait ProposalWriter: Send + Sync {
    /// Insert proposals atomically: either all are stored or none.
    fn insert_batch(&self, proposals: &[ChangeProposal]) -> ProposalResult<()>;

    /// Replace a stored proposal, provided its stored status is still
    /// `expected`. The check and the write happen under one lock, so of two
    /// concurrent transitions out of the same status exactly one succeeds;
    /// the other gets [`ProposalError::StatusConflict`].
    ///
    /// [`ProposalError::StatusConflict`]: crate::error::ProposalError::StatusConflict
    fn transition(
        &self,
        proposal: &ChangeProposal,
        expected: ProposalStatus,
    ) -> ProposalResult<()>;

    /// Remove proposals, as the compensating action of a failed unit of
    /// work. Unknown ids are ignored; returns the number removed.
    fn discard(&self, ids: &[ProposalId]) -> ProposalResult<usize>;
}

/// Read boundary for proposal storage.
pub trait ProposalReader: Send + Sync {
    fn get(&self, id: ProposalId) -> ProposalResult<Option<ChangeProposal>>;

    /// Proposals matching `query`, in insertion order.
    fn list(&self, query: &ProposalQuery) -> ProposalResult<Vec<ChangeProposal>>;

    fn count(&self, query: &ProposalQuery) -> ProposalResult<usize> {
        Ok(self.list(query)?.len())
    }
}

/// Read and write access to one proposal storage.
pub trait ProposalStore: ProposalReader + ProposalWriter {}

impl<T: ProposalReader + ProposalWriter + ?Sized> ProposalStore for T {}
