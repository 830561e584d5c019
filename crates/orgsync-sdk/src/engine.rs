use std::sync::Arc;

use orgsync_changes::{ChangeProposal, FieldValues, InMemoryProposalStore, ProposalQuery};
use orgsync_diff::{compute_diff, DiffConfig, DiffDocument};
use orgsync_registry::{InMemoryVersionRegistry, VersionRegistry};
use orgsync_review::{InMemoryAuditLog, ReviewPermission, ReviewWorkflow};
use orgsync_store::{InMemoryTreeStore, SaveOptions, TreeStore};
use orgsync_sync::{InMemorySynchronizationStore, SyncReport, Synchronization, SynchronizationService};
use orgsync_types::{
    DataSource, DataSourceId, Group, GroupDraft, OrgUnit, OrgUnitDraft, OrgUnitId, ProposalId,
    SourceVersion, SynchronizationId, UserId, VersionId,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::SdkResult;

/// One entry point to every orgsync component, backed by in-memory stores.
pub struct OrgSync {
    config: EngineConfig,
    registry: Arc<InMemoryVersionRegistry>,
    store: Arc<InMemoryTreeStore>,
    proposals: Arc<InMemoryProposalStore>,
    audit: Arc<InMemoryAuditLog>,
    synchronizations: SynchronizationService,
    review: ReviewWorkflow,
}

impl OrgSync {
    pub fn new(config: EngineConfig) -> Self {
        let registry = Arc::new(InMemoryVersionRegistry::new());
        let store = Arc::new(InMemoryTreeStore::new());
        let proposals = Arc::new(InMemoryProposalStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let synchronizations = SynchronizationService::new(
            registry.clone(),
            store.clone(),
            proposals.clone(),
            Arc::new(InMemorySynchronizationStore::new()),
        );
        let review = ReviewWorkflow::new(
            store.clone(),
            proposals.clone(),
            audit.clone(),
            config.review.clone(),
        );
        debug!(?config, "orgsync engine ready");
        Self {
            config,
            registry,
            store,
            proposals,
            audit,
            synchronizations,
            review,
        }
    }

    /// Engine with default configuration.
    pub fn in_memory() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Restrict who may approve and reject proposals.
    pub fn with_permission(mut self, permission: Arc<dyn ReviewPermission>) -> Self {
        self.review = self.review.with_permission(permission);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &InMemoryTreeStore {
        &self.store
    }

    pub fn registry(&self) -> &InMemoryVersionRegistry {
        &self.registry
    }

    pub fn proposal_store(&self) -> &InMemoryProposalStore {
        &self.proposals
    }

    pub fn audit_log(&self) -> &InMemoryAuditLog {
        &self.audit
    }

    // ---- Reference data ----

    pub fn create_data_source(&self, name: &str, description: &str) -> SdkResult<DataSource> {
        Ok(self.registry.create_data_source(name, description)?)
    }

    pub fn create_version(
        &self,
        data_source: DataSourceId,
        description: &str,
    ) -> SdkResult<SourceVersion> {
        Ok(self.registry.create_version(data_source, description)?)
    }

    pub fn create_group(&self, draft: GroupDraft) -> SdkResult<Group> {
        Ok(self.store.create_group(draft)?)
    }

    // ---- Tree ----

    pub fn create_org_unit(&self, draft: OrgUnitDraft) -> SdkResult<OrgUnit> {
        self.registry.require_version(draft.version)?;
        Ok(self.store.create_org_unit(draft, SaveOptions::default())?)
    }

    pub fn org_unit(&self, id: OrgUnitId) -> SdkResult<Option<OrgUnit>> {
        Ok(self.store.org_unit(id)?)
    }

    pub fn reparent(&self, id: OrgUnitId, new_parent: Option<OrgUnitId>) -> SdkResult<OrgUnit> {
        Ok(self.store.reparent(id, new_parent)?)
    }

    pub fn descendants_of(&self, id: OrgUnitId) -> SdkResult<Vec<OrgUnit>> {
        Ok(self.store.descendants_of(id, false)?)
    }

    pub fn ancestors_of(&self, id: OrgUnitId) -> SdkResult<Vec<OrgUnit>> {
        Ok(self.store.ancestors_of(id, false)?)
    }

    // ---- Diff and synchronization ----

    /// Diff two versions without recording anything.
    pub fn diff(
        &self,
        to_update: VersionId,
        compare_with: VersionId,
        config: Option<DiffConfig>,
    ) -> SdkResult<DiffDocument> {
        self.registry.ensure_comparable(to_update, compare_with)?;
        let config = self.diff_config(config)?;
        Ok(compute_diff(self.store.as_ref(), to_update, compare_with, &config)?)
    }

    pub fn create_synchronization(
        &self,
        name: &str,
        to_update: VersionId,
        compare_with: VersionId,
        actor: Option<UserId>,
    ) -> SdkResult<Synchronization> {
        Ok(self
            .synchronizations
            .create_synchronization(name, to_update, compare_with, actor)?)
    }

    pub fn synchronization(&self, id: SynchronizationId) -> SdkResult<Synchronization> {
        Ok(self.synchronizations.synchronization(id)?)
    }

    /// Compute and store the diff of a synchronization. Without an explicit
    /// configuration the `[diff]` defaults apply.
    pub fn create_json_diff(
        &self,
        id: SynchronizationId,
        config: Option<DiffConfig>,
    ) -> SdkResult<Synchronization> {
        let config = self.diff_config(config)?;
        Ok(self.synchronizations.create_json_diff(id, config)?)
    }

    pub fn synchronize_source_versions(
        &self,
        id: SynchronizationId,
        actor: Option<UserId>,
    ) -> SdkResult<SyncReport> {
        Ok(self.synchronizations.synchronize_source_versions(id, actor)?)
    }

    fn diff_config(&self, config: Option<DiffConfig>) -> SdkResult<DiffConfig> {
        match config {
            Some(config) => Ok(config),
            None => self.config.diff.to_diff_config(),
        }
    }

    // ---- Review ----

    pub fn proposal(&self, id: ProposalId) -> SdkResult<ChangeProposal> {
        Ok(self.review.proposal(id)?)
    }

    pub fn proposals(&self, query: &ProposalQuery) -> SdkResult<Vec<ChangeProposal>> {
        Ok(self.review.proposals(query)?)
    }

    pub fn submit_change_request<I, S>(
        &self,
        org_unit: OrgUnitId,
        new: FieldValues,
        requested_fields: I,
        actor: Option<UserId>,
    ) -> SdkResult<ChangeProposal>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.review.submit(org_unit, new, requested_fields, actor)?)
    }

    pub fn approve_change_proposal<I, S>(
        &self,
        id: ProposalId,
        approved_fields: I,
        actor: Option<UserId>,
    ) -> SdkResult<ChangeProposal>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.review.approve(id, approved_fields, actor)?)
    }

    pub fn reject_change_proposal(
        &self,
        id: ProposalId,
        comment: &str,
        actor: Option<UserId>,
    ) -> SdkResult<ChangeProposal> {
        Ok(self.review.reject(id, comment, actor)?)
    }
}
