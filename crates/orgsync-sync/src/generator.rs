//! Turning a diff document into org units and change proposals.
//!
//! Entries are processed root-to-leaf: a candidate creation whose parent is
//! itself a candidate creation is materialized after that parent, and the
//! parent's freshly allocated id is threaded forward. Every write of one run
//! goes into a single [`WriteBatch`], committed together with the proposals;
//! a failure on either side leaves nothing behind.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use orgsync_changes::{ChangeProposal, FieldValues, ProposalField, ProposalWriter};
use orgsync_diff::{DiffDocument, DiffEntry, EntryStatus};
use orgsync_store::{BatchReceipt, SaveOptions, TreeStore, WriteBatch, WriteOp};
use orgsync_types::{
    Group, GroupDraft, GroupId, OrgUnit, OrgUnitDraft, OrgUnitId, SourceRef, SynchronizationId,
    UserId, ValidationStatus, VersionId,
};
use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, SyncResult};

/// What one generator run wrote.
#[derive(Clone, Debug, Default)]
pub struct GenerationOutcome {
    /// Tree store receipt, usable to revert the run.
    pub receipt: BatchReceipt,
    /// Proposals in commit order.
    pub proposals: Vec<ChangeProposal>,
    /// Org units created in the version to update, parents first.
    pub created_org_units: Vec<OrgUnitId>,
    /// Groups created in the version to update.
    pub created_groups: Vec<GroupId>,
}

/// All org units of one version, indexed by id and by `source_ref`.
struct VersionIndex {
    by_id: HashMap<OrgUnitId, OrgUnit>,
    by_ref: HashMap<SourceRef, OrgUnitId>,
}

impl VersionIndex {
    fn load(store: &dyn TreeStore, version: VersionId) -> SyncResult<Self> {
        let units = store.org_units_in_version(version)?;
        let mut by_ref = HashMap::new();
        // Ordered by id: the lowest id keeps a duplicated source_ref.
        for unit in &units {
            if let Some(source_ref) = &unit.source_ref {
                by_ref.entry(source_ref.clone()).or_insert(unit.id);
            }
        }
        let by_id = units.into_iter().map(|u| (u.id, u)).collect();
        Ok(Self { by_id, by_ref })
    }

    fn get_by_ref(&self, source_ref: &SourceRef) -> Option<&OrgUnit> {
        self.by_ref.get(source_ref).and_then(|id| self.by_id.get(id))
    }

    /// Depth following parent links; the root has depth 1.
    fn depth(&self, unit: &OrgUnit) -> usize {
        let mut depth = 1;
        let mut cursor = unit.parent;
        while let Some(id) = cursor {
            if depth > self.by_id.len() {
                break;
            }
            depth += 1;
            cursor = self.by_id.get(&id).and_then(|u| u.parent);
        }
        depth
    }
}

/// Mutable state of one run.
struct Plan<'a> {
    store: &'a dyn TreeStore,
    to_update: VersionId,
    source_groups: HashMap<GroupId, Group>,
    target_groups: HashMap<SourceRef, GroupId>,
    group_map: HashMap<GroupId, Option<GroupId>>,
    created: HashMap<SourceRef, OrgUnitId>,
    batch: WriteBatch,
    outcome: GenerationOutcome,
}

impl Plan<'_> {
    /// Counterpart of a compare-with group in the version to update,
    /// matched by `source_ref` and created when absent.
    fn remap_group(&mut self, source_group: GroupId) -> SyncResult<Option<GroupId>> {
        if let Some(mapped) = self.group_map.get(&source_group) {
            return Ok(*mapped);
        }
        let mapped = match self.source_groups.get(&source_group).cloned() {
            None => None,
            Some(Group {
                source_ref: None, ..
            }) => {
                warn!(group = %source_group, "group without source_ref cannot be matched, skipped");
                None
            }
            Some(Group {
                name,
                source_ref: Some(source_ref),
                ..
            }) => match self.target_groups.get(&source_ref).copied() {
                Some(existing) => Some(existing),
                None => {
                    let id = self.store.allocate_group_id()?;
                    let group = GroupDraft::new(self.to_update, name)
                        .with_source_ref(source_ref.as_str())
                        .into_group(id);
                    debug!(group = %id, source_ref = %source_ref, "creating missing group");
                    self.target_groups.insert(source_ref, id);
                    self.batch.push(WriteOp::InsertGroup(group));
                    self.outcome.created_groups.push(id);
                    Some(id)
                }
            },
        };
        self.group_map.insert(source_group, mapped);
        Ok(mapped)
    }

    fn remap_groups(&mut self, groups: &BTreeSet<GroupId>) -> SyncResult<BTreeSet<GroupId>> {
        let mut out = BTreeSet::new();
        for group in groups {
            if let Some(mapped) = self.remap_group(*group)? {
                out.insert(mapped);
            }
        }
        Ok(out)
    }

    /// Parent in the version to update: the matched counterpart of the
    /// compare-with parent, or a unit created earlier in this run.
    fn resolve_parent(
        &self,
        unit: &OrgUnit,
        source: &VersionIndex,
        target: &VersionIndex,
    ) -> ParentResolution {
        let Some(parent_id) = unit.parent else {
            return ParentResolution::Root;
        };
        let Some(source_ref) = source
            .by_id
            .get(&parent_id)
            .and_then(|p| p.source_ref.as_ref())
        else {
            return ParentResolution::Unresolved;
        };
        target
            .get_by_ref(source_ref)
            .map(|p| p.id)
            .or_else(|| self.created.get(source_ref).copied())
            .map(ParentResolution::Resolved)
            .unwrap_or(ParentResolution::Unresolved)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParentResolution {
    Root,
    Resolved(OrgUnitId),
    Unresolved,
}

impl ParentResolution {
    fn id(self) -> Option<OrgUnitId> {
        match self {
            Self::Resolved(id) => Some(id),
            _ => None,
        }
    }
}

/// Emits change proposals for a diff document.
pub struct ChangeProposalGenerator<'a> {
    store: &'a dyn TreeStore,
    proposals: &'a dyn ProposalWriter,
}

impl<'a> ChangeProposalGenerator<'a> {
    pub fn new(store: &'a dyn TreeStore, proposals: &'a dyn ProposalWriter) -> Self {
        Self { store, proposals }
    }

    /// Apply `document` to `to_update`, reading current values from
    /// `compare_with`.
    ///
    /// Fails with [`ConfigError::StaleDiff`] when an entry no longer matches
    /// the versions: a creation whose `source_ref` now exists in the version
    /// to update, an update whose counterpart disappeared, or an entry whose
    /// compare-with unit is gone.
    pub fn apply_diff(
        &self,
        document: &DiffDocument,
        to_update: VersionId,
        compare_with: VersionId,
        synchronization: Option<SynchronizationId>,
        actor: Option<UserId>,
    ) -> SyncResult<GenerationOutcome> {
        let target = VersionIndex::load(self.store, to_update)?;
        let source = VersionIndex::load(self.store, compare_with)?;

        let mut rows: Vec<(usize, usize, &DiffEntry, &OrgUnit)> =
            Vec::with_capacity(document.len());
        for (position, entry) in document.entries.iter().enumerate() {
            let source_unit = source
                .get_by_ref(&entry.source_ref)
                .ok_or_else(|| stale(entry, "no longer present in the version compared with"))?;
            let matched = target.get_by_ref(&entry.source_ref).is_some();
            match entry.status {
                EntryStatus::New if matched => {
                    return Err(stale(entry, "already present in the version to update").into())
                }
                EntryStatus::Modified if !matched => {
                    return Err(stale(entry, "no longer present in the version to update").into())
                }
                _ => {}
            }
            rows.push((source.depth(source_unit), position, entry, source_unit));
        }
        rows.sort_by_key(|(depth, position, _, _)| (*depth, *position));

        let mut target_groups = HashMap::new();
        for group in self.store.groups_in_version(to_update)? {
            if let Some(source_ref) = group.source_ref {
                target_groups.entry(source_ref).or_insert(group.id);
            }
        }
        let mut plan = Plan {
            store: self.store,
            to_update,
            source_groups: self
                .store
                .groups_in_version(compare_with)?
                .into_iter()
                .map(|g| (g.id, g))
                .collect(),
            target_groups,
            group_map: HashMap::new(),
            created: HashMap::new(),
            batch: WriteBatch::new(),
            outcome: GenerationOutcome::default(),
        };

        let now = Utc::now();
        let mut proposals = Vec::with_capacity(rows.len());
        for (_, _, entry, source_unit) in rows {
            let parent = plan.resolve_parent(source_unit, &source, &target);
            let proposal = match entry.status {
                EntryStatus::New => {
                    if parent == ParentResolution::Unresolved {
                        warn!(
                            source_ref = %entry.source_ref,
                            "parent cannot be resolved, creating as root"
                        );
                    }
                    let unit = materialize(&mut plan, source_unit, parent.id(), now)?;
                    // Mirrors what was written, whatever the diff compared.
                    let written = FieldValues::snapshot(&unit);
                    let requested = written.populated_fields();
                    let proposal =
                        ChangeProposal::for_target(&unit, written, requested, actor, now);
                    plan.created.insert(entry.source_ref.clone(), unit.id);
                    plan.outcome.created_org_units.push(unit.id);
                    plan.batch.push(WriteOp::InsertOrgUnit {
                        unit,
                        options: SaveOptions::default(),
                    });
                    Some(proposal)
                }
                EntryStatus::Modified => {
                    let Some(target_unit) = target.get_by_ref(&entry.source_ref) else {
                        return Err(
                            stale(entry, "no longer present in the version to update").into()
                        );
                    };
                    let requested = entry
                        .modified_fields()
                        .into_iter()
                        .map(ProposalField::from)
                        .collect();
                    change_proposal(
                        &mut plan,
                        entry,
                        source_unit,
                        target_unit,
                        parent,
                        requested,
                        actor,
                        now,
                    )?
                }
            };
            if let Some(proposal) = proposal {
                proposals.push(match synchronization {
                    Some(id) => proposal.with_synchronization(id),
                    None => proposal,
                });
            }
        }

        self.commit(plan, proposals)
    }

    fn commit(
        &self,
        plan: Plan<'_>,
        proposals: Vec<ChangeProposal>,
    ) -> SyncResult<GenerationOutcome> {
        let Plan { batch, mut outcome, .. } = plan;
        if !batch.is_empty() {
            outcome.receipt = self.store.apply_batch(batch)?;
        }
        if let Err(err) = self.proposals.insert_batch(&proposals) {
            if let Err(revert_err) = self.store.revert_batch(&outcome.receipt) {
                error!(error = %revert_err, "failed to revert org units after proposal failure");
            }
            return Err(err.into());
        }
        info!(
            proposals = proposals.len(),
            created_org_units = outcome.created_org_units.len(),
            created_groups = outcome.created_groups.len(),
            "change proposals generated"
        );
        outcome.proposals = proposals;
        Ok(outcome)
    }
}

fn stale(entry: &DiffEntry, reason: &'static str) -> ConfigError {
    ConfigError::StaleDiff {
        source_ref: entry.source_ref.to_string(),
        reason,
    }
}

/// New org unit in the version to update mirroring `source_unit`.
///
/// The code is not copied; codes are unique per version and assigned by
/// reviewers.
fn materialize(
    plan: &mut Plan<'_>,
    source_unit: &OrgUnit,
    parent: Option<OrgUnitId>,
    now: DateTime<Utc>,
) -> SyncResult<OrgUnit> {
    let groups = plan.remap_groups(&source_unit.groups)?;
    let id = plan.store.allocate_org_unit_id()?;
    let mut draft = OrgUnitDraft::new(plan.to_update, source_unit.name.clone())
        .with_status(ValidationStatus::New);
    draft.source_ref = source_unit.source_ref.clone();
    draft.org_unit_type = source_unit.org_unit_type;
    draft.parent = parent;
    draft.groups = groups;
    draft.opening_date = source_unit.opening_date;
    draft.closed_date = source_unit.closed_date;
    draft.location = source_unit.location;
    draft.geometry = source_unit.geometry.clone();
    Ok(OrgUnit::from_draft(id, draft, now))
}

#[allow(clippy::too_many_arguments)]
fn change_proposal(
    plan: &mut Plan<'_>,
    entry: &DiffEntry,
    source_unit: &OrgUnit,
    target_unit: &OrgUnit,
    parent: ParentResolution,
    mut requested: BTreeSet<ProposalField>,
    actor: Option<UserId>,
    now: DateTime<Utc>,
) -> SyncResult<Option<ChangeProposal>> {
    if parent == ParentResolution::Unresolved && requested.remove(&ProposalField::Parent) {
        warn!(
            source_ref = %entry.source_ref,
            "parent cannot be resolved, parent change dropped"
        );
    }
    if requested.is_empty() {
        return Ok(None);
    }
    let mut new = FieldValues::snapshot(source_unit);
    new.parent = parent.id();
    new.groups = if requested.contains(&ProposalField::Groups) {
        plan.remap_groups(&source_unit.groups)?
    } else {
        BTreeSet::new()
    };
    Ok(Some(ChangeProposal::for_target(
        target_unit,
        new,
        requested,
        actor,
        now,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgsync_changes::{
        InMemoryProposalStore, ProposalError, ProposalKind, ProposalQuery, ProposalReader,
        ProposalResult, ProposalStatus,
    };
    use orgsync_diff::{compute_diff, DiffConfig, DiffField};
    use orgsync_store::InMemoryTreeStore;
    use orgsync_types::ProposalId;

    use crate::error::SyncError;

    const A: VersionId = VersionId::new(1);
    const B: VersionId = VersionId::new(2);

    fn save(store: &InMemoryTreeStore, draft: OrgUnitDraft) -> OrgUnit {
        store.create_org_unit(draft, SaveOptions::default()).unwrap()
    }

    fn unit(version: VersionId, name: &str, source_ref: &str) -> OrgUnitDraft {
        OrgUnitDraft::new(version, name).with_source_ref(source_ref)
    }

    fn run(
        store: &InMemoryTreeStore,
        proposals: &InMemoryProposalStore,
    ) -> SyncResult<GenerationOutcome> {
        let document = compute_diff(store, A, B, &DiffConfig::new())?;
        ChangeProposalGenerator::new(store, proposals).apply_diff(&document, A, B, None, None)
    }

    fn find(store: &InMemoryTreeStore, version: VersionId, source_ref: &str) -> OrgUnit {
        store
            .org_units_in_version(version)
            .unwrap()
            .into_iter()
            .find(|u| u.source_ref.as_ref().map(SourceRef::as_str) == Some(source_ref))
            .unwrap()
    }

    struct FailingProposals;

    impl ProposalWriter for FailingProposals {
        fn insert_batch(&self, proposals: &[ChangeProposal]) -> ProposalResult<()> {
            Err(ProposalError::Duplicate(proposals[0].id))
        }

        fn transition(
            &self,
            proposal: &ChangeProposal,
            _expected: ProposalStatus,
        ) -> ProposalResult<()> {
            Err(ProposalError::NotFound(proposal.id))
        }

        fn discard(&self, _ids: &[ProposalId]) -> ProposalResult<usize> {
            Ok(0)
        }
    }

    // ---- updates ----

    #[test]
    fn rename_yields_change_proposal() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        let target = save(&store, unit(A, "Angola", "id-1"));
        save(&store, unit(B, "Angola new", "id-1"));

        let outcome = run(&store, &proposals).unwrap();
        assert_eq!(outcome.proposals.len(), 1);
        assert!(outcome.created_org_units.is_empty());
        let p = &outcome.proposals[0];
        assert_eq!(p.kind, ProposalKind::OrgUnitChange);
        assert_eq!(p.org_unit, target.id);
        assert_eq!(p.old.name.as_deref(), Some("Angola"));
        assert_eq!(p.new.name.as_deref(), Some("Angola new"));
        assert_eq!(p.requested_field_names(), vec!["new_name"]);
        // Updates never touch the live unit.
        assert_eq!(store.org_unit(target.id).unwrap().unwrap().name, "Angola");
        assert_eq!(proposals.count(&ProposalQuery::default()).unwrap(), 1);
    }

    #[test]
    fn parent_change_resolves_to_target_counterpart() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        let a_north = save(&store, unit(A, "North", "r-n"));
        let a_south = save(&store, unit(A, "South", "r-s"));
        save(&store, unit(A, "District", "d-1").with_parent(a_north.id));
        save(&store, unit(B, "North", "r-n"));
        let b_south = save(&store, unit(B, "South", "r-s"));
        save(&store, unit(B, "District", "d-1").with_parent(b_south.id));

        let outcome = run(&store, &proposals).unwrap();
        let p = &outcome.proposals[0];
        assert_eq!(p.requested_field_names(), vec!["new_parent"]);
        assert_eq!(p.old.parent, Some(a_north.id));
        assert_eq!(p.new.parent, Some(a_south.id));
    }

    #[test]
    fn groups_remapped_and_created_in_target() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        let a_hosp = store
            .create_group(GroupDraft::new(A, "Hospitals").with_source_ref("g-h"))
            .unwrap();
        let b_hosp = store
            .create_group(GroupDraft::new(B, "Hospitals").with_source_ref("g-h"))
            .unwrap();
        let b_urban = store
            .create_group(GroupDraft::new(B, "Urban").with_source_ref("g-u"))
            .unwrap();
        let b_loose = store.create_group(GroupDraft::new(B, "Loose")).unwrap();
        save(&store, unit(A, "Central", "id-1").with_group(a_hosp.id));
        save(
            &store,
            unit(B, "Central", "id-1")
                .with_group(b_hosp.id)
                .with_group(b_urban.id)
                .with_group(b_loose.id),
        );

        let outcome = run(&store, &proposals).unwrap();
        assert_eq!(outcome.created_groups.len(), 1);
        let urban_in_a = store.group(outcome.created_groups[0]).unwrap().unwrap();
        assert_eq!(urban_in_a.version, A);
        assert_eq!(urban_in_a.name, "Urban");

        let p = &outcome.proposals[0];
        assert_eq!(p.requested_field_names(), vec!["new_groups"]);
        assert_eq!(p.new.groups, BTreeSet::from([a_hosp.id, urban_in_a.id]));
    }

    // ---- creations ----

    #[test]
    fn new_district_created_under_existing_region() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        let a_region = save(&store, unit(A, "Luanda", "id-2"));
        let b_region = save(&store, unit(B, "Luanda", "id-2"));
        save(&store, unit(B, "Cazenga", "id-3").with_parent(b_region.id).with_code("CZ"));

        let outcome = run(&store, &proposals).unwrap();
        assert_eq!(outcome.created_org_units.len(), 1);
        let created = store.org_unit(outcome.created_org_units[0]).unwrap().unwrap();
        assert_eq!(created.version, A);
        assert_eq!(created.validation_status, ValidationStatus::New);
        assert_eq!(created.parent, Some(a_region.id));
        assert_eq!(created.source_ref.as_ref().map(SourceRef::as_str), Some("id-3"));
        assert!(created.code.is_empty());
        assert_eq!(created.path, Some(a_region.path.unwrap().child(created.id)));

        let p = &outcome.proposals[0];
        assert_eq!(p.kind, ProposalKind::OrgUnitCreation);
        assert_eq!(p.org_unit, created.id);
        assert!(p.old.is_empty());
        assert_eq!(p.new.parent, Some(a_region.id));
        assert_eq!(p.new.name.as_deref(), Some("Cazenga"));
    }

    #[test]
    fn creation_mirrors_written_values_under_narrow_field_list() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        let opened = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let a_region = save(&store, unit(A, "Luanda", "id-2"));
        let b_region = save(&store, unit(B, "Luanda", "id-2"));
        save(
            &store,
            unit(B, "Cazenga", "id-3")
                .with_parent(b_region.id)
                .with_opening_date(opened),
        );

        let config = DiffConfig::new().with_fields([DiffField::Name]);
        let document = compute_diff(&store, A, B, &config).unwrap();
        let outcome = ChangeProposalGenerator::new(&store, &proposals)
            .apply_diff(&document, A, B, None, None)
            .unwrap();

        let created = store.org_unit(outcome.created_org_units[0]).unwrap().unwrap();
        let p = &outcome.proposals[0];
        assert_eq!(created.parent, Some(a_region.id));
        assert_eq!(p.new.parent, created.parent);
        assert_eq!(p.new.opening_date, Some(opened));
        assert_eq!(
            p.requested_field_names(),
            vec!["new_name", "new_parent", "new_opening_date"]
        );
    }

    #[test]
    fn blank_creation_still_requests_name() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        save(&store, unit(B, "", "id-9"));

        let outcome = run(&store, &proposals).unwrap();
        let p = &outcome.proposals[0];
        assert!(p.is_creation());
        assert_eq!(p.requested_field_names(), vec!["new_name"]);
    }

    #[test]
    fn missing_ancestors_created_parent_first() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        let a_region = save(&store, unit(A, "Luanda", "id-2"));
        let b_region = save(&store, unit(B, "Luanda", "id-2"));
        let b_district = save(&store, unit(B, "Cazenga", "id-3").with_parent(b_region.id));
        save(&store, unit(B, "Clinic", "id-4").with_parent(b_district.id));

        let outcome = run(&store, &proposals).unwrap();
        let [district, facility] = outcome.created_org_units[..] else {
            panic!("expected two creations");
        };
        let district = store.org_unit(district).unwrap().unwrap();
        let facility = store.org_unit(facility).unwrap().unwrap();
        assert_eq!(district.source_ref.as_ref().unwrap().as_str(), "id-3");
        assert_eq!(district.parent, Some(a_region.id));
        assert_eq!(facility.parent, Some(district.id));
        assert_eq!(
            facility.path.unwrap().ids(),
            &[a_region.id, district.id, facility.id]
        );
        assert_eq!(outcome.proposals[1].new.parent, Some(district.id));
    }

    #[test]
    fn out_of_order_document_is_reordered() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        let top = save(&store, unit(B, "Top", "t"));
        let mid = save(&store, unit(B, "Mid", "m").with_parent(top.id));
        save(&store, unit(B, "Leaf", "l").with_parent(mid.id));

        let mut document = compute_diff(&store, A, B, &DiffConfig::new()).unwrap();
        document.entries.reverse();
        let outcome = ChangeProposalGenerator::new(&store, &proposals)
            .apply_diff(&document, A, B, None, None)
            .unwrap();

        let order: Vec<String> = outcome
            .proposals
            .iter()
            .map(|p| p.new.name.clone().unwrap())
            .collect();
        assert_eq!(order, vec!["Top", "Mid", "Leaf"]);
        let leaf = find(&store, A, "l");
        let mid_a = find(&store, A, "m");
        assert_eq!(leaf.parent, Some(mid_a.id));
    }

    #[test]
    fn synchronization_id_stamped_on_proposals() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        save(&store, unit(B, "Only", "o"));
        let sync = SynchronizationId::new();
        let document = compute_diff(&store, A, B, &DiffConfig::new()).unwrap();
        ChangeProposalGenerator::new(&store, &proposals)
            .apply_diff(&document, A, B, Some(sync), Some(UserId::new(5)))
            .unwrap();
        let listed = proposals.list(&ProposalQuery::for_synchronization(sync)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_by, Some(UserId::new(5)));
    }

    // ---- failure handling ----

    #[test]
    fn stale_creation_aborts_without_writes() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        save(&store, unit(B, "Cazenga", "id-3"));
        let document = compute_diff(&store, A, B, &DiffConfig::new()).unwrap();
        save(&store, unit(A, "Cazenga", "id-3"));

        let err = ChangeProposalGenerator::new(&store, &proposals)
            .apply_diff(&document, A, B, None, None)
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(ConfigError::StaleDiff { .. })));
        assert_eq!(store.org_units_in_version(A).unwrap().len(), 1);
        assert_eq!(proposals.count(&ProposalQuery::default()).unwrap(), 0);
    }

    #[test]
    fn proposal_failure_reverts_created_units() {
        let store = InMemoryTreeStore::new();
        let b_hosp = store
            .create_group(GroupDraft::new(B, "Hospitals").with_source_ref("g-h"))
            .unwrap();
        let b_region = save(&store, unit(B, "Luanda", "id-2"));
        save(
            &store,
            unit(B, "Cazenga", "id-3")
                .with_parent(b_region.id)
                .with_group(b_hosp.id),
        );

        let document = compute_diff(&store, A, B, &DiffConfig::new()).unwrap();
        let err = ChangeProposalGenerator::new(&store, &FailingProposals)
            .apply_diff(&document, A, B, None, None)
            .unwrap_err();
        assert!(matches!(err, SyncError::Proposal(_)));
        assert!(store.org_units_in_version(A).unwrap().is_empty());
        assert!(store.groups_in_version(A).unwrap().is_empty());
    }

    #[test]
    fn empty_document_writes_nothing() {
        let store = InMemoryTreeStore::new();
        let proposals = InMemoryProposalStore::new();
        let before = store.stats().batches_committed;
        let outcome = ChangeProposalGenerator::new(&store, &proposals)
            .apply_diff(&DiffDocument::default(), A, B, None, None)
            .unwrap();
        assert!(outcome.proposals.is_empty());
        assert_eq!(store.stats().batches_committed, before);
    }
}
