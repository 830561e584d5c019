use std::collections::HashMap;
use std::sync::RwLock;

use orgsync_types::ProposalId;
use tracing::debug;

use crate::error::{ProposalError, ProposalResult};
use crate::proposal::{ChangeProposal, ProposalStatus};
use crate::traits::{ProposalQuery, ProposalReader, ProposalWriter};

/// In-memory proposal store for tests, local demos, and embedding.
#[derive(Debug, Default)]
pub struct InMemoryProposalStore {
    inner: RwLock<ProposalState>,
}

#[derive(Debug, Default)]
struct ProposalState {
    records: Vec<ChangeProposal>,
    index: HashMap<ProposalId, usize>,
}

impl ProposalState {
    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
    }
}

impl InMemoryProposalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProposalWriter for InMemoryProposalStore {
    fn insert_batch(&self, proposals: &[ChangeProposal]) -> ProposalResult<()> {
        let mut state = self.inner.write().map_err(|_| ProposalError::LockPoisoned)?;
        let mut incoming = std::collections::HashSet::with_capacity(proposals.len());
        for proposal in proposals {
            if state.index.contains_key(&proposal.id) || !incoming.insert(proposal.id) {
                return Err(ProposalError::Duplicate(proposal.id));
            }
        }
        for proposal in proposals {
            let position = state.records.len();
            state.index.insert(proposal.id, position);
            state.records.push(proposal.clone());
        }
        debug!(count = proposals.len(), "change proposals stored");
        Ok(())
    }

    fn transition(
        &self,
        proposal: &ChangeProposal,
        expected: ProposalStatus,
    ) -> ProposalResult<()> {
        let mut state = self.inner.write().map_err(|_| ProposalError::LockPoisoned)?;
        let position = *state
            .index
            .get(&proposal.id)
            .ok_or(ProposalError::NotFound(proposal.id))?;
        let actual = state.records[position].status;
        if actual != expected {
            return Err(ProposalError::StatusConflict {
                id: proposal.id,
                expected,
                actual,
            });
        }
        state.records[position] = proposal.clone();
        debug!(
            proposal = %proposal.id,
            from = %expected,
            to = %proposal.status,
            "change proposal transitioned"
        );
        Ok(())
    }

    fn discard(&self, ids: &[ProposalId]) -> ProposalResult<usize> {
        let mut state = self.inner.write().map_err(|_| ProposalError::LockPoisoned)?;
        let before = state.records.len();
        state.records.retain(|p| !ids.contains(&p.id));
        state.reindex();
        Ok(before - state.records.len())
    }
}

impl ProposalReader for InMemoryProposalStore {
    fn get(&self, id: ProposalId) -> ProposalResult<Option<ChangeProposal>> {
        let state = self.inner.read().map_err(|_| ProposalError::LockPoisoned)?;
        Ok(state.index.get(&id).map(|&i| state.records[i].clone()))
    }

    fn list(&self, query: &ProposalQuery) -> ProposalResult<Vec<ChangeProposal>> {
        let state = self.inner.read().map_err(|_| ProposalError::LockPoisoned)?;
        Ok(state
            .records
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }
}
