use chrono::Utc;
use orgsync_types::{
    Group, GroupDraft, GroupId, OrgUnit, OrgUnitDraft, OrgUnitId, VersionId,
};

use crate::batch::{BatchReceipt, SaveOptions, WriteBatch};
use crate::error::{StoreError, StoreResult};

/// Counters describing the storage work performed so far.
///
/// A statement is one storage round trip: a point lookup, a range scan, or a
/// bulk update. Subtree operations are expected to use a constant number of
/// statements regardless of subtree size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub statements: u64,
    pub batches_committed: u64,
    pub batches_rolled_back: u64,
}

/// Persistent org units and groups with materialized ancestry paths.
///
/// All implementations must satisfy these invariants:
/// - A computed path equals the parent's path followed by the unit's own id,
///   or just the unit's id for a root.
/// - Changing a parent recomputes the unit's path and rewrites every
///   descendant path in one bulk statement.
/// - Parents and group memberships never cross versions.
/// - Non-empty codes are unique among non-rejected units of a version.
/// - [`apply_batch`](Self::apply_batch) is all-or-nothing.
pub trait TreeStore: Send + Sync {
    /// Reserve a fresh org unit id.
    fn allocate_org_unit_id(&self) -> StoreResult<OrgUnitId>;

    /// Reserve a fresh group id.
    fn allocate_group_id(&self) -> StoreResult<GroupId>;

    /// Apply all operations atomically.
    fn apply_batch(&self, batch: WriteBatch) -> StoreResult<BatchReceipt>;

    /// Undo a previously committed batch.
    ///
    /// Only valid while no other write touched the same records since the
    /// batch committed; callers serialize their unit of work.
    fn revert_batch(&self, receipt: &BatchReceipt) -> StoreResult<()>;

    /// Read an org unit. Returns `Ok(None)` if it does not exist.
    fn org_unit(&self, id: OrgUnitId) -> StoreResult<Option<OrgUnit>>;

    /// Read several org units in one statement, in the order requested.
    /// Unknown ids are skipped.
    fn org_units(&self, ids: &[OrgUnitId]) -> StoreResult<Vec<OrgUnit>>;

    /// All org units of a version, ordered by id.
    fn org_units_in_version(&self, version: VersionId) -> StoreResult<Vec<OrgUnit>>;

    /// Descendants found by path-prefix matching, ordered by path.
    ///
    /// A unit without a computed path has no computed descendants; with
    /// `include_self` it is returned alone.
    fn descendants_of(&self, id: OrgUnitId, include_self: bool) -> StoreResult<Vec<OrgUnit>>;

    fn group(&self, id: GroupId) -> StoreResult<Option<Group>>;

    /// All groups of a version, ordered by id.
    fn groups_in_version(&self, version: VersionId) -> StoreResult<Vec<Group>>;

    /// Recompute every path of a version from the parent links, in one bulk
    /// statement. Returns the number of paths that changed.
    fn recompute_paths(&self, version: VersionId) -> StoreResult<usize>;

    fn stats(&self) -> StoreStats;

    // ---- Provided operations ----

    /// Create an org unit from a draft and return it with its computed path.
    fn create_org_unit(&self, draft: OrgUnitDraft, options: SaveOptions) -> StoreResult<OrgUnit> {
        let id = self.allocate_org_unit_id()?;
        let unit = OrgUnit::from_draft(id, draft, Utc::now());
        let receipt = self.apply_batch(WriteBatch::new().insert_org_unit(unit, options))?;
        receipt
            .org_unit(id)
            .cloned()
            .ok_or(StoreError::OrgUnitNotFound(id))
    }

    /// Persist changes to an existing org unit, recomputing paths when the
    /// parent changed.
    fn save_org_unit(&self, unit: OrgUnit, options: SaveOptions) -> StoreResult<OrgUnit> {
        let id = unit.id;
        let receipt = self.apply_batch(WriteBatch::new().update_org_unit(unit, options))?;
        receipt
            .org_unit(id)
            .cloned()
            .ok_or(StoreError::OrgUnitNotFound(id))
    }

    /// Move an org unit (and its subtree) under a new parent.
    fn reparent(&self, id: OrgUnitId, new_parent: Option<OrgUnitId>) -> StoreResult<OrgUnit> {
        let mut unit = self.org_unit(id)?.ok_or(StoreError::OrgUnitNotFound(id))?;
        unit.parent = new_parent;
        self.save_org_unit(unit, SaveOptions::default())
    }

    fn create_group(&self, draft: GroupDraft) -> StoreResult<Group> {
        let id = self.allocate_group_id()?;
        let receipt = self.apply_batch(WriteBatch::new().insert_group(draft.into_group(id)))?;
        receipt
            .groups
            .into_iter()
            .next()
            .ok_or(StoreError::GroupNotFound(id))
    }

    /// Ancestors read from the materialized path, root first.
    ///
    /// Returns an empty list when the path has not been computed.
    fn ancestors_of(&self, id: OrgUnitId, include_self: bool) -> StoreResult<Vec<OrgUnit>> {
        let unit = self.org_unit(id)?.ok_or(StoreError::OrgUnitNotFound(id))?;
        match &unit.path {
            None => Ok(Vec::new()),
            Some(path) if include_self => self.org_units(path.ids()),
            Some(path) => self.org_units(path.ancestors()),
        }
    }

    /// Topmost ancestor according to the materialized path.
    fn root_of(&self, id: OrgUnitId) -> StoreResult<Option<OrgUnit>> {
        let unit = self.org_unit(id)?.ok_or(StoreError::OrgUnitNotFound(id))?;
        match &unit.path {
            None => Ok(None),
            Some(path) if path.root_id() == id => Ok(Some(unit)),
            Some(path) => self.org_unit(path.root_id()),
        }
    }
}
