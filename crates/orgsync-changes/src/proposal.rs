use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use orgsync_types::{OrgUnit, OrgUnitId, ProposalId, SynchronizationId, UserId, ValidationStatus};
use serde::{Deserialize, Serialize};

use crate::field::ProposalField;
use crate::values::FieldValues;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalKind {
    OrgUnitCreation,
    OrgUnitChange,
}

impl ProposalKind {
    /// Kind implied by the target's validation status at proposal time:
    /// a `NEW` target is a creation.
    pub fn for_target(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::New => Self::OrgUnitCreation,
            _ => Self::OrgUnitChange,
        }
    }
}

/// Review state. `Approved` and `Rejected` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    #[default]
    New,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::New)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewable creation or modification of one org unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeProposal {
    pub id: ProposalId,
    /// Target org unit: the existing unit for a change, the freshly created
    /// one for a creation.
    pub org_unit: OrgUnitId,
    pub kind: ProposalKind,
    pub status: ProposalStatus,
    /// Frozen at creation, empty for a creation.
    pub old: FieldValues,
    /// Proposed values. Only the requested fields are meaningful.
    pub new: FieldValues,
    pub requested_fields: BTreeSet<ProposalField>,
    pub approved_fields: BTreeSet<ProposalField>,
    pub rejection_comment: Option<String>,
    /// Synchronization that generated this proposal, if any.
    pub synchronization: Option<SynchronizationId>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

impl ChangeProposal {
    /// Build a proposal against `target`, snapshotting its current values.
    ///
    /// `new` is restricted to `requested_fields` so that unrequested values
    /// never linger on the record.
    pub fn for_target(
        target: &OrgUnit,
        new: FieldValues,
        requested_fields: BTreeSet<ProposalField>,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        let kind = ProposalKind::for_target(target.validation_status);
        let old = match kind {
            ProposalKind::OrgUnitCreation => FieldValues::default(),
            ProposalKind::OrgUnitChange => FieldValues::snapshot(target),
        };
        Self {
            id: ProposalId::new(),
            org_unit: target.id,
            kind,
            status: ProposalStatus::New,
            old,
            new: new.restricted_to(&requested_fields),
            requested_fields,
            approved_fields: BTreeSet::new(),
            rejection_comment: None,
            synchronization: None,
            created_by,
            created_at: now,
            updated_by: created_by,
            updated_at: now,
        }
    }

    pub fn with_synchronization(mut self, synchronization: SynchronizationId) -> Self {
        self.synchronization = Some(synchronization);
        self
    }

    pub fn is_creation(&self) -> bool {
        self.kind == ProposalKind::OrgUnitCreation
    }

    /// Requested field names, in field order.
    pub fn requested_field_names(&self) -> Vec<&'static str> {
        self.requested_fields.iter().map(ProposalField::as_str).collect()
    }
}
