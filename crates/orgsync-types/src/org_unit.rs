use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::geometry::{MultiPolygon, Point};
use crate::ids::{GroupId, InstanceId, OrgUnitId, OrgUnitTypeId, SourceRef, VersionId};
use crate::path::OrgPath;

/// Review state of an org unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// Created but not yet reviewed.
    #[default]
    New,
    Valid,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Valid => "VALID",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "VALID" => Ok(Self::Valid),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(TypeError::InvalidStatus(s.to_string())),
        }
    }
}

/// A node of the administrative hierarchy, scoped to one version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrgUnit {
    pub id: OrgUnitId,
    pub version: VersionId,
    pub source_ref: Option<SourceRef>,
    pub name: String,
    pub org_unit_type: Option<OrgUnitTypeId>,
    pub validation_status: ValidationStatus,
    pub parent: Option<OrgUnitId>,
    /// Materialized ancestry. `None` until computable.
    pub path: Option<OrgPath>,
    pub groups: BTreeSet<GroupId>,
    pub opening_date: Option<NaiveDate>,
    pub closed_date: Option<NaiveDate>,
    pub location: Option<Point>,
    pub geometry: Option<MultiPolygon>,
    /// Free-form code; unique among active units of a version when non-empty.
    pub code: String,
    pub reference_instances: BTreeSet<InstanceId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrgUnit {
    /// Materialize a draft under an allocated id. The path is left `None`;
    /// stores compute it on write.
    pub fn from_draft(id: OrgUnitId, draft: OrgUnitDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            version: draft.version,
            source_ref: draft.source_ref,
            name: draft.name,
            org_unit_type: draft.org_unit_type,
            validation_status: draft.validation_status,
            parent: draft.parent,
            path: None,
            groups: draft.groups,
            opening_date: draft.opening_date,
            closed_date: draft.closed_date,
            location: draft.location,
            geometry: draft.geometry,
            code: draft.code,
            reference_instances: draft.reference_instances,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether the code of this unit participates in the per-version
    /// uniqueness constraint.
    pub fn has_active_code(&self) -> bool {
        !self.code.trim().is_empty() && self.validation_status != ValidationStatus::Rejected
    }
}

/// Fields needed to create an org unit. Built with chained setters.
#[derive(Clone, Debug, PartialEq)]
pub struct OrgUnitDraft {
    pub version: VersionId,
    pub name: String,
    pub source_ref: Option<SourceRef>,
    pub org_unit_type: Option<OrgUnitTypeId>,
    pub validation_status: ValidationStatus,
    pub parent: Option<OrgUnitId>,
    pub groups: BTreeSet<GroupId>,
    pub opening_date: Option<NaiveDate>,
    pub closed_date: Option<NaiveDate>,
    pub location: Option<Point>,
    pub geometry: Option<MultiPolygon>,
    pub code: String,
    pub reference_instances: BTreeSet<InstanceId>,
}

impl OrgUnitDraft {
    pub fn new(version: VersionId, name: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            source_ref: None,
            org_unit_type: None,
            validation_status: ValidationStatus::Valid,
            parent: None,
            groups: BTreeSet::new(),
            opening_date: None,
            closed_date: None,
            location: None,
            geometry: None,
            code: String::new(),
            reference_instances: BTreeSet::new(),
        }
    }

    pub fn with_source_ref(mut self, source_ref: impl AsRef<str>) -> Self {
        self.source_ref = SourceRef::parse(source_ref);
        self
    }

    pub fn with_parent(mut self, parent: OrgUnitId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_type(mut self, org_unit_type: OrgUnitTypeId) -> Self {
        self.org_unit_type = Some(org_unit_type);
        self
    }

    pub fn with_status(mut self, status: ValidationStatus) -> Self {
        self.validation_status = status;
        self
    }

    pub fn with_group(mut self, group: GroupId) -> Self {
        self.groups.insert(group);
        self
    }

    pub fn with_opening_date(mut self, date: NaiveDate) -> Self {
        self.opening_date = Some(date);
        self
    }

    pub fn with_closed_date(mut self, date: NaiveDate) -> Self {
        self.closed_date = Some(date);
        self
    }

    pub fn with_location(mut self, location: Point) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_geometry(mut self, geometry: MultiPolygon) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_reference_instance(mut self, instance: InstanceId) -> Self {
        self.reference_instances.insert(instance);
        self
    }
}
