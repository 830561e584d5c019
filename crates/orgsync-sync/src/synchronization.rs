//! Synchronization records and their storage.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use orgsync_diff::{DiffConfig, DiffDocument};
use orgsync_types::{SynchronizationId, UserId, VersionId};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Reconciliation of one version against another of the same data source.
///
/// Created by a reviewer, then filled by a diff run, then applied exactly
/// once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Synchronization {
    pub id: SynchronizationId,
    pub name: String,
    pub source_version_to_update: VersionId,
    pub source_version_to_compare_with: VersionId,
    /// Parameters of the last diff run.
    pub config: Option<DiffConfig>,
    /// Canonical rendering of `config`.
    pub diff_config: Option<String>,
    /// BLAKE3 fingerprint of `diff_config`.
    pub diff_fingerprint: Option<String>,
    pub json_diff: Option<DiffDocument>,
    pub count_create: usize,
    pub count_update: usize,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synchronized_by: Option<UserId>,
    pub synchronized_at: Option<DateTime<Utc>>,
}

impl Synchronization {
    pub fn new(
        name: impl Into<String>,
        source_version_to_update: VersionId,
        source_version_to_compare_with: VersionId,
        created_by: Option<UserId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SynchronizationId::new(),
            name: name.into(),
            source_version_to_update,
            source_version_to_compare_with,
            config: None,
            diff_config: None,
            diff_fingerprint: None,
            json_diff: None,
            count_create: 0,
            count_update: 0,
            created_by,
            created_at: now,
            updated_at: now,
            synchronized_by: None,
            synchronized_at: None,
        }
    }

    pub fn has_diff(&self) -> bool {
        self.json_diff.is_some()
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized_at.is_some()
    }
}

/// Storage for synchronization records.
pub trait SynchronizationStore: Send + Sync {
    fn insert(&self, synchronization: &Synchronization) -> SyncResult<()>;

    fn get(&self, id: SynchronizationId) -> SyncResult<Option<Synchronization>>;

    /// Replace a stored record.
    fn update(&self, synchronization: &Synchronization) -> SyncResult<()>;

    /// All records, oldest first.
    fn list(&self) -> SyncResult<Vec<Synchronization>>;
}

/// In-memory synchronization store for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySynchronizationStore {
    records: RwLock<BTreeMap<SynchronizationId, Synchronization>>,
}

impl InMemorySynchronizationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SynchronizationStore for InMemorySynchronizationStore {
    fn insert(&self, synchronization: &Synchronization) -> SyncResult<()> {
        let mut records = self.records.write().map_err(|_| SyncError::LockPoisoned)?;
        records.insert(synchronization.id, synchronization.clone());
        Ok(())
    }

    fn get(&self, id: SynchronizationId) -> SyncResult<Option<Synchronization>> {
        let records = self.records.read().map_err(|_| SyncError::LockPoisoned)?;
        Ok(records.get(&id).cloned())
    }

    fn update(&self, synchronization: &Synchronization) -> SyncResult<()> {
        let mut records = self.records.write().map_err(|_| SyncError::LockPoisoned)?;
        match records.get_mut(&synchronization.id) {
            Some(slot) => {
                *slot = synchronization.clone();
                Ok(())
            }
            None => Err(SyncError::NotFound(synchronization.id)),
        }
    }

    fn list(&self) -> SyncResult<Vec<Synchronization>> {
        let records = self.records.read().map_err(|_| SyncError::LockPoisoned)?;
        let mut all: Vec<Synchronization> = records.values().cloned().collect();
        all.sort_by_key(|s| s.created_at);
        Ok(all)
    }
}
