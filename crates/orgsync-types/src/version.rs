use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DataSourceId, GroupId, SourceRef, VersionId};

/// A named origin of master data, owning a numbered sequence of versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: DataSourceId,
    pub name: String,
    pub description: String,
    /// Version served by default to readers, usually the latest approved one.
    pub default_version: Option<VersionId>,
    pub created_at: DateTime<Utc>,
}

/// A snapshot of a hierarchy belonging to one data source.
///
/// `number` is sequential and unique within the data source. The identity
/// of a version never changes once org units reference it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVersion {
    pub id: VersionId,
    pub data_source: DataSourceId,
    pub number: u32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl SourceVersion {
    /// Display label, e.g. `"v3"`.
    pub fn label(&self) -> String {
        format!("v{}", self.number)
    }
}

/// A named set of org units, scoped to one version.
///
/// Groups sharing a `source_ref` across versions are the same logical group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub version: VersionId,
    pub name: String,
    pub source_ref: Option<SourceRef>,
}

/// Fields needed to create a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDraft {
    pub version: VersionId,
    pub name: String,
    pub source_ref: Option<SourceRef>,
}

impl GroupDraft {
    pub fn new(version: VersionId, name: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            source_ref: None,
        }
    }

    pub fn with_source_ref(mut self, source_ref: impl AsRef<str>) -> Self {
        self.source_ref = SourceRef::parse(source_ref);
        self
    }

    pub fn into_group(self, id: GroupId) -> Group {
        Group {
            id,
            version: self.version,
            name: self.name,
            source_ref: self.source_ref,
        }
    }
}
