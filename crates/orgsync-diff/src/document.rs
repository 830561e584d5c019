//! The diff document: the persisted output of one diff run.
//!
//! Serialized as an ordered JSON list of entries:
//!
//! ```json
//! [{"sourceRef": "id-1", "status": "modified", "comparisons": [
//!     {"field": "name", "before": "Angola", "after": "Angola new",
//!      "status": "modified", "distance": 0.1667}]}]
//! ```

use orgsync_types::SourceRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DiffError, DiffResult};
use crate::field::DiffField;

/// Outcome of comparing one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Unchanged,
    Modified,
}

/// One field compared across the two versions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldComparison {
    pub field: DiffField,
    /// Value in the version being updated, `null` for a creation.
    pub before: Value,
    /// Value in the version compared with.
    pub after: Value,
    pub status: ComparisonStatus,
    /// String dissimilarity in `[0, 1]`, set for modified names only.
    pub distance: Option<f64>,
}

impl FieldComparison {
    pub fn is_modified(&self) -> bool {
        self.status == ComparisonStatus::Modified
    }
}

/// Whether a compare-with org unit has a counterpart in the version being
/// updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// No counterpart: a candidate creation.
    New,
    /// Counterpart found with at least one modified field.
    Modified,
}

/// Comparison of one logical org unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub source_ref: SourceRef,
    pub status: EntryStatus,
    pub comparisons: Vec<FieldComparison>,
}

impl DiffEntry {
    pub fn is_creation(&self) -> bool {
        self.status == EntryStatus::New
    }

    /// Fields whose comparison is `modified`, in comparison order.
    pub fn modified_fields(&self) -> Vec<DiffField> {
        self.comparisons
            .iter()
            .filter(|c| c.is_modified())
            .map(|c| c.field)
            .collect()
    }

    pub fn comparison(&self, field: DiffField) -> Option<&FieldComparison> {
        self.comparisons.iter().find(|c| c.field == field)
    }
}

/// Ordered list of entries, parents before children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffDocument {
    pub entries: Vec<DiffEntry>,
}

impl DiffDocument {
    pub fn new(entries: Vec<DiffEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of candidate creations.
    pub fn count_create(&self) -> usize {
        self.entries.iter().filter(|e| e.is_creation()).count()
    }

    /// Number of candidate updates.
    pub fn count_update(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_creation()).count()
    }

    pub fn entry(&self, source_ref: &str) -> Option<&DiffEntry> {
        self.entries.iter().find(|e| e.source_ref.as_str() == source_ref)
    }

    pub fn to_json(&self) -> DiffResult<String> {
        serde_json::to_string(self).map_err(|e| DiffError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> DiffResult<Self> {
        serde_json::from_str(json).map_err(|e| DiffError::Serialization(e.to_string()))
    }
}
