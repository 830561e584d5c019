//! Diff parameters and their canonical rendering.
//!
//! The canonical string is retained on the synchronization record for audit
//! and guard checks, so it must be byte-for-byte reproducible: filters are
//! normalized, the field list is sorted and deduplicated, and an empty field
//! list is expanded to the default fields before serialization.

use orgsync_registry::OrgUnitFilter;
use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};
use crate::field::DiffField;

/// Domain tag mixed into the fingerprint hash.
const FINGERPRINT_DOMAIN: &str = "orgsync-diff-config-v1";

/// Parameters of one diff run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Candidate filter applied to the version being updated.
    #[serde(default)]
    pub to_update: OrgUnitFilter,
    /// Candidate filter applied to the version compared with.
    #[serde(default)]
    pub compare_with: OrgUnitFilter,
    /// Fields to compare. Empty means [`DiffField::DEFAULT`].
    #[serde(default)]
    pub field_names: Vec<DiffField>,
    /// Leave group membership out of the comparison.
    #[serde(default)]
    pub ignore_groups: bool,
}

impl DiffConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_to_update(mut self, filter: OrgUnitFilter) -> Self {
        self.to_update = filter;
        self
    }

    pub fn with_compare_with(mut self, filter: OrgUnitFilter) -> Self {
        self.compare_with = filter;
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = DiffField>) -> Self {
        self.field_names = fields.into_iter().collect();
        self
    }

    /// Parse the field allowlist from field names.
    pub fn with_field_names<I, S>(mut self, names: I) -> DiffResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.field_names = names
            .into_iter()
            .map(|n| n.as_ref().parse())
            .collect::<DiffResult<_>>()?;
        Ok(self)
    }

    pub fn ignoring_groups(mut self) -> Self {
        self.ignore_groups = true;
        self
    }

    /// Fields actually compared, in comparison order.
    pub fn effective_fields(&self) -> Vec<DiffField> {
        let candidates = if self.field_names.is_empty() {
            &DiffField::DEFAULT[..]
        } else {
            &DiffField::ALL[..]
        };
        candidates
            .iter()
            .copied()
            .filter(|f| self.field_names.is_empty() || self.field_names.contains(f))
            .filter(|f| !(self.ignore_groups && *f == DiffField::Groups))
            .collect()
    }

    /// Deterministic rendering of this configuration.
    pub fn canonical(&self) -> DiffResult<String> {
        let normalized = DiffConfig {
            to_update: self.to_update.normalized(),
            compare_with: self.compare_with.normalized(),
            field_names: self.effective_fields(),
            ignore_groups: self.ignore_groups,
        };
        serde_json::to_string(&normalized).map_err(|e| DiffError::Serialization(e.to_string()))
    }

    /// Hex BLAKE3 digest of [`canonical`](Self::canonical).
    pub fn fingerprint(&self) -> DiffResult<String> {
        let canonical = self.canonical()?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(FINGERPRINT_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize().as_bytes()))
    }
}
