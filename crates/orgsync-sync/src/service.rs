use std::sync::Arc;

use chrono::Utc;
use orgsync_changes::{ChangeProposal, ProposalWriter};
use orgsync_diff::{compute_diff, DiffConfig};
use orgsync_registry::VersionRegistry;
use orgsync_store::TreeStore;
use orgsync_types::{GroupId, OrgUnitId, ProposalId, SynchronizationId, UserId, VersionId};
use tracing::{error, info, instrument};

use crate::error::{ConfigError, SyncError, SyncResult};
use crate::generator::ChangeProposalGenerator;
use crate::synchronization::{Synchronization, SynchronizationStore};

/// Result of applying a synchronization.
#[derive(Clone, Debug)]
pub struct SyncReport {
    pub synchronization: Synchronization,
    pub proposals: Vec<ChangeProposal>,
    pub created_org_units: Vec<OrgUnitId>,
    pub created_groups: Vec<GroupId>,
}

/// Lifecycle of synchronizations: create, refresh the diff, apply.
pub struct SynchronizationService {
    registry: Arc<dyn VersionRegistry>,
    store: Arc<dyn TreeStore>,
    proposals: Arc<dyn ProposalWriter>,
    synchronizations: Arc<dyn SynchronizationStore>,
}

impl SynchronizationService {
    pub fn new(
        registry: Arc<dyn VersionRegistry>,
        store: Arc<dyn TreeStore>,
        proposals: Arc<dyn ProposalWriter>,
        synchronizations: Arc<dyn SynchronizationStore>,
    ) -> Self {
        Self {
            registry,
            store,
            proposals,
            synchronizations,
        }
    }

    /// Record a new synchronization between two versions of one data source.
    #[instrument(skip(self, name))]
    pub fn create_synchronization(
        &self,
        name: &str,
        to_update: VersionId,
        compare_with: VersionId,
        created_by: Option<UserId>,
    ) -> SyncResult<Synchronization> {
        self.registry.ensure_comparable(to_update, compare_with)?;
        let synchronization = Synchronization::new(name, to_update, compare_with, created_by);
        self.synchronizations.insert(&synchronization)?;
        info!(synchronization = %synchronization.id, "synchronization created");
        Ok(synchronization)
    }

    pub fn synchronization(&self, id: SynchronizationId) -> SyncResult<Synchronization> {
        self.synchronizations.get(id)?.ok_or(SyncError::NotFound(id))
    }

    pub fn synchronizations(&self) -> SyncResult<Vec<Synchronization>> {
        self.synchronizations.list()
    }

    /// Compute the diff and store it on the record with its counts.
    ///
    /// Re-running overwrites the previous diff. Refused once the
    /// synchronization has been applied.
    #[instrument(skip(self, config))]
    pub fn create_json_diff(
        &self,
        id: SynchronizationId,
        config: DiffConfig,
    ) -> SyncResult<Synchronization> {
        let mut synchronization = self.synchronization(id)?;
        if synchronization.is_synchronized() {
            return Err(ConfigError::AlreadySynchronized(id).into());
        }
        let document = compute_diff(
            self.store.as_ref(),
            synchronization.source_version_to_update,
            synchronization.source_version_to_compare_with,
            &config,
        )?;

        synchronization.diff_config = Some(config.canonical()?);
        synchronization.diff_fingerprint = Some(config.fingerprint()?);
        synchronization.config = Some(config);
        synchronization.count_create = document.count_create();
        synchronization.count_update = document.count_update();
        synchronization.json_diff = Some(document);
        synchronization.updated_at = Utc::now();
        self.synchronizations.update(&synchronization)?;

        info!(
            count_create = synchronization.count_create,
            count_update = synchronization.count_update,
            "diff stored"
        );
        Ok(synchronization)
    }

    /// Apply the stored diff: create missing org units and emit one change
    /// proposal per entry. Runs at most once per synchronization.
    #[instrument(skip(self))]
    pub fn synchronize_source_versions(
        &self,
        id: SynchronizationId,
        actor: Option<UserId>,
    ) -> SyncResult<SyncReport> {
        let mut synchronization = self.synchronization(id)?;
        if synchronization.is_synchronized() {
            return Err(ConfigError::AlreadySynchronized(id).into());
        }
        let Some(document) = synchronization.json_diff.as_ref() else {
            return Err(ConfigError::DiffMissing(id).into());
        };

        let generator = ChangeProposalGenerator::new(self.store.as_ref(), self.proposals.as_ref());
        let outcome = generator.apply_diff(
            document,
            synchronization.source_version_to_update,
            synchronization.source_version_to_compare_with,
            Some(id),
            actor,
        )?;

        let now = Utc::now();
        synchronization.synchronized_at = Some(now);
        synchronization.synchronized_by = actor;
        synchronization.updated_at = now;
        if let Err(err) = self.synchronizations.update(&synchronization) {
            let ids: Vec<ProposalId> = outcome.proposals.iter().map(|p| p.id).collect();
            if let Err(discard_err) = self.proposals.discard(&ids) {
                error!(error = %discard_err, "failed to discard proposals");
            }
            if let Err(revert_err) = self.store.revert_batch(&outcome.receipt) {
                error!(error = %revert_err, "failed to revert org units");
            }
            return Err(err);
        }

        info!(proposals = outcome.proposals.len(), "synchronization applied");
        Ok(SyncReport {
            synchronization,
            proposals: outcome.proposals,
            created_org_units: outcome.created_org_units,
            created_groups: outcome.created_groups,
        })
    }
}
