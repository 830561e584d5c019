use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use orgsync_changes::{
    ChangeProposal, FieldValues, ProposalError, ProposalField, ProposalQuery, ProposalStatus,
    ProposalStore,
};
use orgsync_store::{BatchReceipt, SaveOptions, TreeStore, WriteBatch};
use orgsync_types::{OrgUnit, OrgUnitId, ProposalId, UserId, ValidationStatus};
use tracing::{error, info, warn};

use crate::audit::{AuditEntry, AuditSink};
use crate::check::{ReviewAction, ReviewRequest};
use crate::config::ReviewConfig;
use crate::error::{ReviewError, ReviewResult};
use crate::permission::{AllowAll, ReviewPermission};
use crate::pipeline::ReviewPipeline;

/// Approves, rejects and submits change proposals.
///
/// A decision is one unit of work across three collaborators: the proposal
/// status transition, the org unit write and the audit entry. The transition
/// is claimed first, guarded on the stored status still being `NEW`; any
/// later failing step undoes the earlier ones.
pub struct ReviewWorkflow {
    store: Arc<dyn TreeStore>,
    proposals: Arc<dyn ProposalStore>,
    audit: Arc<dyn AuditSink>,
    permission: Arc<dyn ReviewPermission>,
    pipeline: ReviewPipeline,
}

impl ReviewWorkflow {
    /// Workflow with the default check pipeline; every caller may review.
    pub fn new(
        store: Arc<dyn TreeStore>,
        proposals: Arc<dyn ProposalStore>,
        audit: Arc<dyn AuditSink>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            store,
            proposals,
            audit,
            permission: Arc::new(AllowAll),
            pipeline: ReviewPipeline::with_default_checks(config),
        }
    }

    pub fn with_permission(mut self, permission: Arc<dyn ReviewPermission>) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_pipeline(mut self, pipeline: ReviewPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        self.pipeline.config()
    }

    pub fn proposal(&self, id: ProposalId) -> ReviewResult<ChangeProposal> {
        self.proposals
            .get(id)?
            .ok_or(ReviewError::ProposalNotFound(id))
    }

    pub fn proposals(&self, query: &ProposalQuery) -> ReviewResult<Vec<ChangeProposal>> {
        Ok(self.proposals.list(query)?)
    }

    /// Approve `approved_fields` of a proposal.
    ///
    /// Each approved field's proposed value is written onto the org unit;
    /// an empty value erases. Fields outside the approved set keep their live
    /// value even when requested. The org unit becomes `VALID`.
    pub fn approve<I, S>(
        &self,
        id: ProposalId,
        approved_fields: I,
        actor: Option<UserId>,
    ) -> ReviewResult<ChangeProposal>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = parse_fields(approved_fields)?;
        let proposal = self.proposal(id)?;
        self.decide(proposal, ReviewAction::Approve { fields }, actor)
    }

    /// Reject a proposal. The org unit becomes `REJECTED`.
    pub fn reject(
        &self,
        id: ProposalId,
        comment: &str,
        actor: Option<UserId>,
    ) -> ReviewResult<ChangeProposal> {
        let proposal = self.proposal(id)?;
        self.decide(
            proposal,
            ReviewAction::Reject {
                comment: comment.to_string(),
            },
            actor,
        )
    }

    /// Record a manual change request against an existing org unit.
    pub fn submit<I, S>(
        &self,
        org_unit: OrgUnitId,
        new: FieldValues,
        requested_fields: I,
        actor: Option<UserId>,
    ) -> ReviewResult<ChangeProposal>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = parse_fields(requested_fields)?;
        if requested.is_empty() {
            return Err(ReviewError::NoFieldsRequested);
        }
        let target = self
            .store
            .org_unit(org_unit)?
            .ok_or(ReviewError::OrgUnitMissing(org_unit))?;
        let proposal = ChangeProposal::for_target(&target, new, requested, actor, Utc::now());
        self.proposals.insert_batch(std::slice::from_ref(&proposal))?;
        info!(
            proposal = %proposal.id,
            org_unit = %org_unit,
            fields = ?proposal.requested_field_names(),
            "change request submitted"
        );
        Ok(proposal)
    }

    fn decide(
        &self,
        proposal: ChangeProposal,
        action: ReviewAction,
        actor: Option<UserId>,
    ) -> ReviewResult<ChangeProposal> {
        let request = ReviewRequest {
            proposal: &proposal,
            action,
            actor,
        };
        self.pipeline.evaluate(&request, self.permission.as_ref())?;

        let before = self
            .store
            .org_unit(proposal.org_unit)?
            .ok_or(ReviewError::OrgUnitMissing(proposal.org_unit))?;
        let now = Utc::now();
        let mut unit = before.clone();
        let mut reviewed = proposal.clone();
        match &request.action {
            ReviewAction::Approve { fields } => {
                proposal.new.apply_to(&mut unit, fields);
                unit.validation_status = ValidationStatus::Valid;
                reviewed.status = ProposalStatus::Approved;
                reviewed.approved_fields = fields.clone();
            }
            ReviewAction::Reject { comment } => {
                unit.validation_status = ValidationStatus::Rejected;
                reviewed.status = ProposalStatus::Rejected;
                let comment = comment.trim();
                reviewed.rejection_comment = (!comment.is_empty()).then(|| comment.to_string());
            }
        }
        unit.updated_at = now;
        reviewed.updated_by = actor;
        reviewed.updated_at = now;

        self.claim(&reviewed)?;
        let receipt = match self
            .store
            .apply_batch(WriteBatch::new().update_org_unit(unit, SaveOptions::default()))
        {
            Ok(receipt) => receipt,
            Err(err) => {
                self.release(&proposal, reviewed.status);
                return Err(err.into());
            }
        };
        if let Err(err) = self.record_audit(&before, &receipt, &reviewed, actor) {
            warn!(proposal = %proposal.id, error = %err, "review aborted, reverting org unit");
            if let Err(revert_err) = self.store.revert_batch(&receipt) {
                error!(error = %revert_err, "failed to revert org unit");
            }
            self.release(&proposal, reviewed.status);
            return Err(err);
        }

        info!(
            proposal = %reviewed.id,
            org_unit = %reviewed.org_unit,
            status = %reviewed.status,
            "proposal reviewed"
        );
        Ok(reviewed)
    }

    /// Move the stored proposal out of `NEW`. Of two decisions racing on one
    /// proposal only the first claim lands; the other sees a state conflict
    /// before touching the org unit.
    fn claim(&self, reviewed: &ChangeProposal) -> ReviewResult<()> {
        self.proposals
            .transition(reviewed, ProposalStatus::New)
            .map_err(|err| match err {
                ProposalError::StatusConflict { id, actual, .. } => ReviewError::StateConflict {
                    proposal: id,
                    status: actual,
                },
                other => other.into(),
            })
    }

    /// Put a claimed proposal back to its undecided state.
    fn release(&self, original: &ChangeProposal, claimed: ProposalStatus) {
        if let Err(err) = self.proposals.transition(original, claimed) {
            error!(proposal = %original.id, error = %err, "failed to restore proposal");
        }
    }

    fn record_audit(
        &self,
        before: &OrgUnit,
        receipt: &BatchReceipt,
        reviewed: &ChangeProposal,
        actor: Option<UserId>,
    ) -> ReviewResult<()> {
        let after = receipt
            .org_unit(before.id)
            .ok_or(ReviewError::OrgUnitMissing(before.id))?;
        let entry = AuditEntry::for_change(before, after, actor, reviewed.id)?;
        self.audit.record(entry)
    }
}

fn parse_fields<I, S>(names: I) -> ReviewResult<BTreeSet<ProposalField>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| {
            let name = name.as_ref();
            name.parse::<ProposalField>()
                .map_err(|_| ReviewError::InvalidField {
                    field: name.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use orgsync_changes::{InMemoryProposalStore, ProposalReader};
    use orgsync_store::{InMemoryTreeStore, StoreError};
    use orgsync_types::{GroupDraft, InstanceId, OrgUnitDraft, VersionId};

    use crate::audit::InMemoryAuditLog;
    use crate::permission::AllowList;

    const V: VersionId = VersionId::new(1);

    struct Fixture {
        store: Arc<InMemoryTreeStore>,
        proposals: Arc<InMemoryProposalStore>,
        audit: Arc<InMemoryAuditLog>,
        workflow: ReviewWorkflow,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryTreeStore::new());
        let proposals = Arc::new(InMemoryProposalStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let workflow = ReviewWorkflow::new(
            store.clone(),
            proposals.clone(),
            audit.clone(),
            ReviewConfig::default(),
        );
        Fixture {
            store,
            proposals,
            audit,
            workflow,
        }
    }

    fn opening() -> NaiveDate {
        NaiveDate::from_ymd_opt(1975, 11, 11).unwrap()
    }

    fn angola(f: &Fixture) -> OrgUnit {
        f.store
            .create_org_unit(
                OrgUnitDraft::new(V, "Angola")
                    .with_status(ValidationStatus::Valid)
                    .with_opening_date(opening()),
                SaveOptions::default(),
            )
            .unwrap()
    }

    /// Name and opening date change requested; the new opening date erases.
    fn rename_request(f: &Fixture, unit: &OrgUnit) -> ChangeProposal {
        f.workflow
            .submit(
                unit.id,
                FieldValues {
                    name: Some("Angola new".into()),
                    ..FieldValues::default()
                },
                ["new_name", "new_opening_date"],
                Some(UserId::new(1)),
            )
            .unwrap()
    }

    // ---- approve ----

    #[test]
    fn partial_approval_leaves_unapproved_fields() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);

        let approved = f
            .workflow
            .approve(p.id, ["new_name"], Some(UserId::new(2)))
            .unwrap();
        assert_eq!(approved.status, ProposalStatus::Approved);
        assert_eq!(approved.approved_fields, BTreeSet::from([ProposalField::Name]));
        assert_eq!(approved.updated_by, Some(UserId::new(2)));

        let live = f.store.org_unit(unit.id).unwrap().unwrap();
        assert_eq!(live.name, "Angola new");
        assert_eq!(live.opening_date, Some(opening()));
        assert_eq!(live.validation_status, ValidationStatus::Valid);
        // Frozen snapshot.
        assert_eq!(approved.old.name.as_deref(), Some("Angola"));
    }

    #[test]
    fn approving_empty_value_erases() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);

        f.workflow
            .approve(p.id, ["new_name", "new_opening_date"], None)
            .unwrap();
        let live = f.store.org_unit(unit.id).unwrap().unwrap();
        assert_eq!(live.opening_date, None);
    }

    #[test]
    fn approval_writes_audit_entry() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);
        f.workflow
            .approve(p.id, ["new_name"], Some(UserId::new(2)))
            .unwrap();

        let entries = f.audit.for_proposal(p.id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].object_id, unit.id);
        assert_eq!(entries[0].before["name"], "Angola");
        assert_eq!(entries[0].after["name"], "Angola new");
        assert_eq!(entries[0].actor, Some(UserId::new(2)));
    }

    #[test]
    fn groups_and_reference_instances_replaced_wholesale() {
        let f = fixture();
        let keep = f.store.create_group(GroupDraft::new(V, "Keep")).unwrap();
        let gone = f.store.create_group(GroupDraft::new(V, "Gone")).unwrap();
        let unit = f
            .store
            .create_org_unit(
                OrgUnitDraft::new(V, "Clinic")
                    .with_group(keep.id)
                    .with_group(gone.id)
                    .with_reference_instance(InstanceId::new(1)),
                SaveOptions::default(),
            )
            .unwrap();
        let p = f
            .workflow
            .submit(
                unit.id,
                FieldValues {
                    groups: BTreeSet::from([keep.id]),
                    reference_instances: BTreeSet::from([InstanceId::new(2)]),
                    ..FieldValues::default()
                },
                ["new_groups", "new_reference_instances"],
                None,
            )
            .unwrap();
        f.workflow
            .approve(p.id, ["new_groups", "new_reference_instances"], None)
            .unwrap();

        let live = f.store.org_unit(unit.id).unwrap().unwrap();
        assert_eq!(live.groups, BTreeSet::from([keep.id]));
        assert_eq!(live.reference_instances, BTreeSet::from([InstanceId::new(2)]));
    }

    #[test]
    fn approving_parent_moves_subtree() {
        let f = fixture();
        let north = angola(&f);
        let south = f
            .store
            .create_org_unit(OrgUnitDraft::new(V, "South"), SaveOptions::default())
            .unwrap();
        let district = f
            .store
            .create_org_unit(
                OrgUnitDraft::new(V, "District").with_parent(north.id),
                SaveOptions::default(),
            )
            .unwrap();
        let p = f
            .workflow
            .submit(
                district.id,
                FieldValues {
                    parent: Some(south.id),
                    ..FieldValues::default()
                },
                ["new_parent"],
                None,
            )
            .unwrap();
        f.workflow.approve(p.id, ["new_parent"], None).unwrap();

        let live = f.store.org_unit(district.id).unwrap().unwrap();
        assert_eq!(live.path.unwrap().ids(), &[south.id, district.id]);
    }

    #[test]
    fn integrity_failure_leaves_everything_unchanged() {
        let f = fixture();
        let foreign = f
            .store
            .create_group(GroupDraft::new(VersionId::new(2), "Elsewhere"))
            .unwrap();
        let unit = angola(&f);
        let p = f
            .workflow
            .submit(
                unit.id,
                FieldValues {
                    groups: BTreeSet::from([foreign.id]),
                    ..FieldValues::default()
                },
                ["new_groups"],
                None,
            )
            .unwrap();

        let err = f.workflow.approve(p.id, ["new_groups"], None).unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Store(StoreError::CrossVersionGroup { .. })
        ));
        assert_eq!(
            f.proposals.get(p.id).unwrap().unwrap().status,
            ProposalStatus::New
        );
        assert!(f.store.org_unit(unit.id).unwrap().unwrap().groups.is_empty());
        assert!(f.audit.entries().is_empty());
    }

    // ---- validation ----

    #[test]
    fn unknown_field_name_is_refused() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);
        let err = f.workflow.approve(p.id, ["name"], None).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidField { .. }));
        assert_eq!(err.field(), Some("name"));
        assert!(err.is_request_error());
    }

    #[test]
    fn submit_requires_fields_and_target() {
        let f = fixture();
        let err = f
            .workflow
            .submit(OrgUnitId::new(99), FieldValues::default(), ["new_name"], None)
            .unwrap_err();
        assert!(matches!(err, ReviewError::OrgUnitMissing(_)));

        let unit = angola(&f);
        let err = f
            .workflow
            .submit(unit.id, FieldValues::default(), Vec::<&str>::new(), None)
            .unwrap_err();
        assert!(matches!(err, ReviewError::NoFieldsRequested));
    }

    #[test]
    fn unlisted_reviewer_is_denied() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);
        let workflow = ReviewWorkflow::new(
            f.store.clone(),
            f.proposals.clone(),
            f.audit.clone(),
            ReviewConfig::default(),
        )
        .with_permission(Arc::new(AllowList::new([UserId::new(7)])));

        let err = workflow
            .approve(p.id, ["new_name"], Some(UserId::new(8)))
            .unwrap_err();
        assert!(matches!(err, ReviewError::PermissionDenied { .. }));
        workflow
            .approve(p.id, ["new_name"], Some(UserId::new(7)))
            .unwrap();
    }

    // ---- reject and terminality ----

    #[test]
    fn reject_requires_comment() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);

        let err = f.workflow.reject(p.id, "", None).unwrap_err();
        assert!(matches!(err, ReviewError::MissingComment { .. }));
        assert_eq!(
            f.store.org_unit(unit.id).unwrap().unwrap().validation_status,
            ValidationStatus::Valid
        );

        let rejected = f.workflow.reject(p.id, "wrong spelling", None).unwrap();
        assert_eq!(rejected.status, ProposalStatus::Rejected);
        assert_eq!(rejected.rejection_comment.as_deref(), Some("wrong spelling"));
        let live = f.store.org_unit(unit.id).unwrap().unwrap();
        assert_eq!(live.validation_status, ValidationStatus::Rejected);
        assert_eq!(live.name, "Angola");
    }

    #[test]
    fn decided_proposals_are_terminal() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);
        f.workflow.approve(p.id, ["new_name"], None).unwrap();

        for err in [
            f.workflow.approve(p.id, ["new_name"], None).unwrap_err(),
            f.workflow.reject(p.id, "late", None).unwrap_err(),
        ] {
            assert!(matches!(
                err,
                ReviewError::StateConflict {
                    status: ProposalStatus::Approved,
                    ..
                }
            ));
            assert_eq!(err.field(), Some("status"));
        }
        assert_eq!(f.audit.entries().len(), 1);
    }

    #[test]
    fn listing_by_status() {
        let f = fixture();
        let unit = angola(&f);
        let first = rename_request(&f, &unit);
        rename_request(&f, &unit);
        f.workflow.reject(first.id, "duplicate", None).unwrap();

        let open = f
            .workflow
            .proposals(&ProposalQuery::for_org_unit(unit.id).with_status(ProposalStatus::New))
            .unwrap();
        assert_eq!(open.len(), 1);
        assert!(matches!(
            f.workflow.proposal(ProposalId::new()),
            Err(ReviewError::ProposalNotFound(_))
        ));
    }

    // ---- interleaved decisions ----

    /// Reviewer whose permission check lets a second reviewer reject the
    /// same proposal first.
    struct OvertakingReviewer {
        other: ReviewWorkflow,
        other_outcome: std::sync::Mutex<Option<ProposalStatus>>,
    }

    impl ReviewPermission for OvertakingReviewer {
        fn may_review(&self, _actor: Option<UserId>, proposal: &ChangeProposal) -> bool {
            let mut outcome = self.other_outcome.lock().unwrap();
            if outcome.is_none() {
                let rejected = self.other.reject(proposal.id, "duplicate", None).unwrap();
                *outcome = Some(rejected.status);
            }
            true
        }
    }

    #[test]
    fn overtaken_decision_surfaces_state_conflict() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);
        let overtaking = Arc::new(OvertakingReviewer {
            other: ReviewWorkflow::new(
                f.store.clone(),
                f.proposals.clone(),
                f.audit.clone(),
                ReviewConfig::default(),
            ),
            other_outcome: std::sync::Mutex::new(None),
        });
        let workflow = ReviewWorkflow::new(
            f.store.clone(),
            f.proposals.clone(),
            f.audit.clone(),
            ReviewConfig::default(),
        )
        .with_permission(overtaking.clone());

        let err = workflow.approve(p.id, ["new_name"], None).unwrap_err();
        assert!(matches!(
            err,
            ReviewError::StateConflict {
                status: ProposalStatus::Rejected,
                ..
            }
        ));
        assert_eq!(
            *overtaking.other_outcome.lock().unwrap(),
            Some(ProposalStatus::Rejected)
        );

        assert_eq!(
            f.proposals.get(p.id).unwrap().unwrap().status,
            ProposalStatus::Rejected
        );
        let live = f.store.org_unit(unit.id).unwrap().unwrap();
        assert_eq!(live.name, "Angola");
        assert_eq!(live.validation_status, ValidationStatus::Rejected);
        assert_eq!(f.audit.entries().len(), 1);
    }

    struct BrokenAudit;

    impl AuditSink for BrokenAudit {
        fn record(&self, _entry: AuditEntry) -> ReviewResult<()> {
            Err(ReviewError::Audit("disk full".into()))
        }
    }

    #[test]
    fn audit_failure_restores_proposal_and_org_unit() {
        let f = fixture();
        let unit = angola(&f);
        let p = rename_request(&f, &unit);
        let workflow = ReviewWorkflow::new(
            f.store.clone(),
            f.proposals.clone(),
            Arc::new(BrokenAudit),
            ReviewConfig::default(),
        );

        let err = workflow.approve(p.id, ["new_name"], None).unwrap_err();
        assert!(matches!(err, ReviewError::Audit(_)));
        assert_eq!(
            f.proposals.get(p.id).unwrap().unwrap().status,
            ProposalStatus::New
        );
        assert_eq!(f.store.org_unit(unit.id).unwrap().unwrap().name, "Angola");

        // Still reviewable once the sink recovers.
        f.workflow.approve(p.id, ["new_name"], None).unwrap();
    }
}
