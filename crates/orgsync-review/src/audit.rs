//! Audit trail of review decisions.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use orgsync_types::{OrgUnit, OrgUnitId, ProposalId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, ReviewResult};

/// Before/after snapshot of one org unit, keyed to the proposal that
/// changed it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub object_id: OrgUnitId,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub actor: Option<UserId>,
    pub proposal: ProposalId,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn for_change(
        before: &OrgUnit,
        after: &OrgUnit,
        actor: Option<UserId>,
        proposal: ProposalId,
    ) -> ReviewResult<Self> {
        Ok(Self {
            object_id: after.id,
            before: serde_json::to_value(before)?,
            after: serde_json::to_value(after)?,
            actor,
            proposal,
            at: Utc::now(),
        })
    }
}

/// Receives audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> ReviewResult<()>;
}

/// Audit sink that keeps entries in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn for_proposal(&self, proposal: ProposalId) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.proposal == proposal)
            .collect()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, entry: AuditEntry) -> ReviewResult<()> {
        self.entries
            .write()
            .map_err(|_| ReviewError::Audit("audit log lock poisoned".into()))?
            .push(entry);
        Ok(())
    }
}
