use orgsync_types::{GroupId, OrgUnitId, VersionId};

/// Errors from tree store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested org unit does not exist.
    #[error("org unit not found: {0}")]
    OrgUnitNotFound(OrgUnitId),

    /// The requested group does not exist.
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    /// An insert reused an id that is already taken.
    #[error("org unit already exists: {0}")]
    DuplicateOrgUnit(OrgUnitId),

    #[error("group already exists: {0}")]
    DuplicateGroup(GroupId),

    /// The parent belongs to another version than the child.
    #[error("parent {parent} of {org_unit} belongs to another version")]
    CrossVersionParent { org_unit: OrgUnitId, parent: OrgUnitId },

    /// A group membership crosses versions.
    #[error("group {group} of {org_unit} belongs to another version")]
    CrossVersionGroup { org_unit: OrgUnitId, group: GroupId },

    /// Two active org units of one version share a code.
    #[error("code {code:?} already used by {existing} in {version}")]
    DuplicateCode {
        version: VersionId,
        code: String,
        existing: OrgUnitId,
    },

    /// The new parent is the unit itself or one of its descendants.
    #[error("cannot attach {org_unit} under its own descendant {parent}")]
    ParentCycle { org_unit: OrgUnitId, parent: OrgUnitId },

    /// Org units never move between versions.
    #[error("org unit {0} cannot change version")]
    VersionChange(OrgUnitId),

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Constraint violations raised at write time, as opposed to lookups
    /// that found nothing.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateOrgUnit(_)
                | Self::DuplicateGroup(_)
                | Self::CrossVersionParent { .. }
                | Self::CrossVersionGroup { .. }
                | Self::DuplicateCode { .. }
                | Self::ParentCycle { .. }
                | Self::VersionChange(_)
        )
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
