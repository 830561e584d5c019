use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use orgsync_types::{Group, GroupId, OrgPath, OrgUnit, OrgUnitId, VersionId};
use tracing::{debug, info, warn};

use crate::batch::{BatchReceipt, UndoEntry, WriteBatch, WriteOp};
use crate::error::{StoreError, StoreResult};
use crate::traits::{StoreStats, TreeStore};

/// In-memory tree store.
///
/// Intended for tests and embedding. State lives behind a single `RwLock`;
/// writers are serialized, which also serializes concurrent reparenting of
/// overlapping subtrees. Paths are indexed in a `BTreeMap`, so a subtree is
/// one contiguous range scan starting at the subtree root's path.
pub struct InMemoryTreeStore {
    state: RwLock<TreeState>,
    next_org_unit: AtomicU64,
    next_group: AtomicU64,
    statements: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

#[derive(Default)]
struct TreeState {
    units: HashMap<OrgUnitId, OrgUnit>,
    groups: HashMap<GroupId, Group>,
    units_by_version: HashMap<VersionId, BTreeSet<OrgUnitId>>,
    groups_by_version: HashMap<VersionId, BTreeSet<GroupId>>,
    children: HashMap<OrgUnitId, BTreeSet<OrgUnitId>>,
    paths: BTreeMap<OrgPath, OrgUnitId>,
    active_codes: HashMap<(VersionId, String), OrgUnitId>,
}

impl TreeState {
    fn code_key(unit: &OrgUnit) -> Option<(VersionId, String)> {
        unit.has_active_code()
            .then(|| (unit.version, unit.code.trim().to_string()))
    }

    fn put_unit(&mut self, unit: OrgUnit) -> Option<OrgUnit> {
        let prior = self.remove_unit(unit.id);
        self.units_by_version
            .entry(unit.version)
            .or_default()
            .insert(unit.id);
        if let Some(parent) = unit.parent {
            self.children.entry(parent).or_default().insert(unit.id);
        }
        if let Some(path) = &unit.path {
            self.paths.insert(path.clone(), unit.id);
        }
        if let Some(key) = Self::code_key(&unit) {
            self.active_codes.insert(key, unit.id);
        }
        self.units.insert(unit.id, unit);
        prior
    }

    fn remove_unit(&mut self, id: OrgUnitId) -> Option<OrgUnit> {
        let unit = self.units.remove(&id)?;
        if let Some(ids) = self.units_by_version.get_mut(&unit.version) {
            ids.remove(&id);
        }
        if let Some(parent) = unit.parent {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(&id);
            }
        }
        if let Some(path) = &unit.path {
            if self.paths.get(path) == Some(&id) {
                self.paths.remove(path);
            }
        }
        if let Some(key) = Self::code_key(&unit) {
            if self.active_codes.get(&key) == Some(&id) {
                self.active_codes.remove(&key);
            }
        }
        Some(unit)
    }

    fn put_group(&mut self, group: Group) -> Option<Group> {
        let prior = self.remove_group(group.id);
        self.groups_by_version
            .entry(group.version)
            .or_default()
            .insert(group.id);
        self.groups.insert(group.id, group);
        prior
    }

    fn remove_group(&mut self, id: GroupId) -> Option<Group> {
        let group = self.groups.remove(&id)?;
        if let Some(ids) = self.groups_by_version.get_mut(&group.version) {
            ids.remove(&id);
        }
        Some(group)
    }

    /// Ids of strict descendants, found by scanning the path index from
    /// `path` while entries keep it as a prefix.
    fn descendant_ids(&self, path: &OrgPath) -> Vec<OrgUnitId> {
        self.paths
            .range((Bound::Excluded(path.clone()), Bound::Unbounded))
            .take_while(|(p, _)| path.is_prefix_of(p))
            .map(|(_, id)| *id)
            .collect()
    }

    fn computed_path(&self, unit: &OrgUnit) -> Option<OrgPath> {
        match unit.parent {
            None => Some(OrgPath::root(unit.id)),
            Some(parent) => self
                .units
                .get(&parent)
                .and_then(|p| p.path.as_ref())
                .map(|p| p.child(unit.id)),
        }
    }

    /// `true` if `candidate` is `id` or sits below it, following parent
    /// links so that units with stale paths are covered too.
    fn is_in_subtree(&self, candidate: OrgUnitId, id: OrgUnitId) -> bool {
        let mut cursor = Some(candidate);
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if current == id {
                return true;
            }
            steps += 1;
            if steps > self.units.len() {
                return false;
            }
            cursor = self.units.get(&current).and_then(|u| u.parent);
        }
        false
    }

    fn validate(&self, unit: &OrgUnit) -> StoreResult<()> {
        if let Some(parent_id) = unit.parent {
            let parent = self
                .units
                .get(&parent_id)
                .ok_or(StoreError::OrgUnitNotFound(parent_id))?;
            if parent.version != unit.version {
                return Err(StoreError::CrossVersionParent {
                    org_unit: unit.id,
                    parent: parent_id,
                });
            }
            if self.is_in_subtree(parent_id, unit.id) {
                return Err(StoreError::ParentCycle {
                    org_unit: unit.id,
                    parent: parent_id,
                });
            }
        }
        for group_id in &unit.groups {
            let group = self
                .groups
                .get(group_id)
                .ok_or(StoreError::GroupNotFound(*group_id))?;
            if group.version != unit.version {
                return Err(StoreError::CrossVersionGroup {
                    org_unit: unit.id,
                    group: *group_id,
                });
            }
        }
        if let Some(key) = Self::code_key(unit) {
            if let Some(existing) = self.active_codes.get(&key) {
                if *existing != unit.id {
                    return Err(StoreError::DuplicateCode {
                        version: key.0,
                        code: key.1,
                        existing: *existing,
                    });
                }
            }
        }
        Ok(())
    }

    /// Rewrite the paths below `unit` after its own path went from `old` to
    /// `new`. Returns the number of rewritten paths.
    fn cascade(
        &mut self,
        unit: OrgUnitId,
        old: Option<&OrgPath>,
        new: Option<&OrgPath>,
        undo: &mut Vec<UndoEntry>,
    ) -> usize {
        let rewrites: Vec<(OrgUnitId, Option<OrgPath>)> = match (old, new) {
            (Some(old), new) => self
                .descendant_ids(old)
                .into_iter()
                .filter_map(|id| {
                    let current = self.units.get(&id)?.path.as_ref()?;
                    let rebased = new.and_then(|n| current.rebase(old, n));
                    Some((id, rebased))
                })
                .collect(),
            // The old path was never computed, so the index cannot find the
            // subtree; walk the child links instead.
            (None, Some(new)) => self.paths_from_children(unit, new),
            (None, None) => Vec::new(),
        };

        let count = rewrites.len();
        for (id, path) in rewrites {
            if let Some(mut descendant) = self.units.get(&id).cloned() {
                undo.push(UndoEntry::OrgUnit {
                    id,
                    prior: Some(descendant.clone()),
                });
                descendant.path = path;
                self.put_unit(descendant);
            }
        }
        count
    }

    /// Paths of every unit below `root`, derived breadth-first from child
    /// links and `root_path`.
    fn paths_from_children(
        &self,
        root: OrgUnitId,
        root_path: &OrgPath,
    ) -> Vec<(OrgUnitId, Option<OrgPath>)> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([(root, root_path.clone())]);
        while let Some((id, path)) = queue.pop_front() {
            if let Some(children) = self.children.get(&id) {
                for child in children {
                    let child_path = path.child(*child);
                    out.push((*child, Some(child_path.clone())));
                    queue.push_back((*child, child_path));
                }
            }
        }
        out
    }

    fn apply_op(
        &mut self,
        op: WriteOp,
        undo: &mut Vec<UndoEntry>,
        receipt: &mut BatchReceipt,
    ) -> StoreResult<()> {
        match op {
            WriteOp::InsertGroup(group) => {
                if self.groups.contains_key(&group.id) {
                    return Err(StoreError::DuplicateGroup(group.id));
                }
                undo.push(UndoEntry::Group {
                    id: group.id,
                    prior: None,
                });
                receipt.groups.push(group.clone());
                self.put_group(group);
            }
            WriteOp::InsertOrgUnit { mut unit, options } => {
                if self.units.contains_key(&unit.id) {
                    return Err(StoreError::DuplicateOrgUnit(unit.id));
                }
                self.validate(&unit)?;
                if !options.skip_path_calculation {
                    unit.path = self.computed_path(&unit);
                }
                undo.push(UndoEntry::OrgUnit {
                    id: unit.id,
                    prior: None,
                });
                receipt.org_units.push(unit.clone());
                self.put_unit(unit);
            }
            WriteOp::UpdateOrgUnit { mut unit, options } => {
                let prior = self
                    .units
                    .get(&unit.id)
                    .cloned()
                    .ok_or(StoreError::OrgUnitNotFound(unit.id))?;
                if prior.version != unit.version {
                    return Err(StoreError::VersionChange(unit.id));
                }
                self.validate(&unit)?;

                let recompute = !options.skip_path_calculation
                    && (prior.parent != unit.parent || prior.path.is_none());
                if recompute {
                    unit.path = self.computed_path(&unit);
                } else if !options.skip_path_calculation {
                    unit.path = prior.path.clone();
                }
                unit.created_at = prior.created_at;
                unit.updated_at = Utc::now();

                let path_changed = unit.path != prior.path;
                let new_path = unit.path.clone();
                undo.push(UndoEntry::OrgUnit {
                    id: unit.id,
                    prior: Some(prior.clone()),
                });
                receipt.org_units.push(unit.clone());
                let id = unit.id;
                self.put_unit(unit);

                if recompute && path_changed {
                    let rewritten = self.cascade(id, prior.path.as_ref(), new_path.as_ref(), undo);
                    receipt.cascaded_paths += rewritten;
                    debug!(org_unit = %id, descendants = rewritten, "recomputed subtree paths");
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self, undo: &[UndoEntry]) {
        for entry in undo.iter().rev() {
            match entry {
                UndoEntry::OrgUnit { id, prior } => match prior {
                    Some(unit) => {
                        self.put_unit(unit.clone());
                    }
                    None => {
                        self.remove_unit(*id);
                    }
                },
                UndoEntry::Group { id, prior } => match prior {
                    Some(group) => {
                        self.put_group(group.clone());
                    }
                    None => {
                        self.remove_group(*id);
                    }
                },
            }
        }
    }
}

impl InMemoryTreeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TreeState::default()),
            next_org_unit: AtomicU64::new(1),
            next_group: AtomicU64::new(1),
            statements: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
        }
    }

    /// Number of org units across all versions.
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.units.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no org units.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn statement(&self) {
        self.statements.fetch_add(1, Ordering::Relaxed);
    }

    fn read_state(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, TreeState>> {
        self.statement();
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_state(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, TreeState>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryTreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStore for InMemoryTreeStore {
    fn allocate_org_unit_id(&self) -> StoreResult<OrgUnitId> {
        Ok(OrgUnitId::new(self.next_org_unit.fetch_add(1, Ordering::Relaxed)))
    }

    fn allocate_group_id(&self) -> StoreResult<GroupId> {
        Ok(GroupId::new(self.next_group.fetch_add(1, Ordering::Relaxed)))
    }

    fn apply_batch(&self, batch: WriteBatch) -> StoreResult<BatchReceipt> {
        let mut state = self.write_state()?;
        let mut undo = Vec::new();
        let mut receipt = BatchReceipt::default();
        let op_count = batch.len();

        for op in batch.into_ops() {
            // One statement per explicit write; a cascade is a single bulk
            // statement on top of it.
            self.statement();
            let before = receipt.cascaded_paths;
            if let Err(err) = state.apply_op(op, &mut undo, &mut receipt) {
                state.rollback(&undo);
                self.rolled_back.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, ops = op_count, "write batch rolled back");
                return Err(err);
            }
            if receipt.cascaded_paths > before {
                self.statement();
            }
        }

        self.committed.fetch_add(1, Ordering::Relaxed);
        if op_count > 1 {
            info!(
                ops = op_count,
                org_units = receipt.org_units.len(),
                groups = receipt.groups.len(),
                cascaded = receipt.cascaded_paths,
                "write batch committed"
            );
        }
        receipt.undo = undo;
        Ok(receipt)
    }

    fn revert_batch(&self, receipt: &BatchReceipt) -> StoreResult<()> {
        self.statement();
        let mut state = self.write_state()?;
        state.rollback(&receipt.undo);
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
        warn!(entries = receipt.undo.len(), "committed batch reverted");
        Ok(())
    }

    fn org_unit(&self, id: OrgUnitId) -> StoreResult<Option<OrgUnit>> {
        let state = self.read_state()?;
        Ok(state.units.get(&id).cloned())
    }

    fn org_units(&self, ids: &[OrgUnitId]) -> StoreResult<Vec<OrgUnit>> {
        let state = self.read_state()?;
        Ok(ids.iter().filter_map(|id| state.units.get(id).cloned()).collect())
    }

    fn org_units_in_version(&self, version: VersionId) -> StoreResult<Vec<OrgUnit>> {
        let state = self.read_state()?;
        Ok(state
            .units_by_version
            .get(&version)
            .map(|ids| ids.iter().filter_map(|id| state.units.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    fn descendants_of(&self, id: OrgUnitId, include_self: bool) -> StoreResult<Vec<OrgUnit>> {
        let state = self.read_state()?;
        let unit = state.units.get(&id).ok_or(StoreError::OrgUnitNotFound(id))?;
        let mut out = Vec::new();
        if include_self {
            out.push(unit.clone());
        }
        if let Some(path) = &unit.path {
            out.extend(
                state
                    .descendant_ids(path)
                    .into_iter()
                    .filter_map(|d| state.units.get(&d).cloned()),
            );
        }
        Ok(out)
    }

    fn group(&self, id: GroupId) -> StoreResult<Option<Group>> {
        let state = self.read_state()?;
        Ok(state.groups.get(&id).cloned())
    }

    fn groups_in_version(&self, version: VersionId) -> StoreResult<Vec<Group>> {
        let state = self.read_state()?;
        Ok(state
            .groups_by_version
            .get(&version)
            .map(|ids| ids.iter().filter_map(|id| state.groups.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    fn recompute_paths(&self, version: VersionId) -> StoreResult<usize> {
        self.statement();
        let mut state = self.write_state()?;
        let ids: Vec<OrgUnitId> = state
            .units_by_version
            .get(&version)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        let mut computed: HashMap<OrgUnitId, OrgPath> = HashMap::new();
        for root in ids.iter().filter(|id| {
            state.units.get(id).map(|u| u.parent.is_none()).unwrap_or(false)
        }) {
            let root_path = OrgPath::root(*root);
            computed.insert(*root, root_path.clone());
            for (id, path) in state.paths_from_children(*root, &root_path) {
                if let Some(path) = path {
                    computed.insert(id, path);
                }
            }
        }

        let mut changed = 0;
        for id in ids {
            let Some(mut unit) = state.units.get(&id).cloned() else {
                continue;
            };
            let path = computed.remove(&id);
            if unit.path != path {
                unit.path = path;
                state.put_unit(unit);
                changed += 1;
            }
        }
        info!(version = %version, changed, "recomputed version paths");
        Ok(changed)
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            statements: self.statements.load(Ordering::Relaxed),
            batches_committed: self.committed.load(Ordering::Relaxed),
            batches_rolled_back: self.rolled_back.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for InMemoryTreeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTreeStore")
            .field("org_unit_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::SaveOptions;
    use orgsync_types::{GroupDraft, OrgUnitDraft, ValidationStatus};
    use proptest::prelude::*;

    const V1: VersionId = VersionId::new(1);
    const V2: VersionId = VersionId::new(2);

    fn create(store: &InMemoryTreeStore, name: &str, parent: Option<OrgUnitId>) -> OrgUnit {
        let mut draft = OrgUnitDraft::new(V1, name);
        if let Some(parent) = parent {
            draft = draft.with_parent(parent);
        }
        store.create_org_unit(draft, SaveOptions::default()).unwrap()
    }

    /// Builds `root -> a -> (a1, a2 -> a2x)` and `root -> b`.
    fn sample_tree(store: &InMemoryTreeStore) -> HashMap<&'static str, OrgUnitId> {
        let root = create(store, "root", None).id;
        let a = create(store, "a", Some(root)).id;
        let a1 = create(store, "a1", Some(a)).id;
        let a2 = create(store, "a2", Some(a)).id;
        let a2x = create(store, "a2x", Some(a2)).id;
        let b = create(store, "b", Some(root)).id;
        HashMap::from([
            ("root", root),
            ("a", a),
            ("a1", a1),
            ("a2", a2),
            ("a2x", a2x),
            ("b", b),
        ])
    }

    fn assert_path_invariant(store: &InMemoryTreeStore, version: VersionId) {
        let units = store.org_units_in_version(version).unwrap();
        let by_id: HashMap<OrgUnitId, &OrgUnit> = units.iter().map(|u| (u.id, u)).collect();
        for unit in &units {
            let Some(path) = &unit.path else { continue };
            match unit.parent {
                None => assert_eq!(path, &OrgPath::root(unit.id)),
                Some(parent) => {
                    let parent_path = by_id[&parent].path.as_ref().expect("parent path");
                    assert_eq!(path, &parent_path.child(unit.id));
                }
            }
        }
    }

    fn names(units: &[OrgUnit]) -> Vec<&str> {
        units.iter().map(|u| u.name.as_str()).collect()
    }

    // -----------------------------------------------------------------------
    // Path computation
    // -----------------------------------------------------------------------

    #[test]
    fn root_path_is_own_id() {
        let store = InMemoryTreeStore::new();
        let root = create(&store, "root", None);
        assert_eq!(root.path, Some(OrgPath::root(root.id)));
    }

    #[test]
    fn child_path_extends_parent() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let a2x = store.org_unit(ids["a2x"]).unwrap().unwrap();
        let expected = OrgPath::from_ids(vec![ids["root"], ids["a"], ids["a2"], ids["a2x"]]).unwrap();
        assert_eq!(a2x.path, Some(expected));
        assert_path_invariant(&store, V1);
    }

    #[test]
    fn child_of_pathless_parent_has_no_path() {
        let store = InMemoryTreeStore::new();
        let parent = store
            .create_org_unit(OrgUnitDraft::new(V1, "imported"), SaveOptions::skip_paths())
            .unwrap();
        assert!(parent.path.is_none());
        let child = create(&store, "child", Some(parent.id));
        assert!(child.path.is_none());
        assert!(store.descendants_of(parent.id, false).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Ancestor / descendant queries
    // -----------------------------------------------------------------------

    #[test]
    fn descendants_by_path_prefix() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let below_a = store.descendants_of(ids["a"], false).unwrap();
        assert_eq!(names(&below_a), vec!["a1", "a2", "a2x"]);
        let with_self = store.descendants_of(ids["a"], true).unwrap();
        assert_eq!(names(&with_self), vec!["a", "a1", "a2", "a2x"]);
    }

    #[test]
    fn ancestors_root_first() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let ancestors = store.ancestors_of(ids["a2x"], false).unwrap();
        assert_eq!(names(&ancestors), vec!["root", "a", "a2"]);
        let with_self = store.ancestors_of(ids["a2x"], true).unwrap();
        assert_eq!(names(&with_self), vec!["root", "a", "a2", "a2x"]);
        assert_eq!(store.root_of(ids["a2x"]).unwrap().unwrap().id, ids["root"]);
    }

    // -----------------------------------------------------------------------
    // Reparenting
    // -----------------------------------------------------------------------

    #[test]
    fn reparent_cascades_to_descendants() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        store.reparent(ids["a"], Some(ids["b"])).unwrap();

        let a2x = store.org_unit(ids["a2x"]).unwrap().unwrap();
        let expected =
            OrgPath::from_ids(vec![ids["root"], ids["b"], ids["a"], ids["a2"], ids["a2x"]]).unwrap();
        assert_eq!(a2x.path, Some(expected));
        assert_eq!(names(&store.descendants_of(ids["b"], false).unwrap()), vec!["a", "a1", "a2", "a2x"]);
        assert_path_invariant(&store, V1);
    }

    #[test]
    fn reparent_to_root() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let a = store.reparent(ids["a"], None).unwrap();
        assert_eq!(a.path, Some(OrgPath::root(ids["a"])));
        let a1 = store.org_unit(ids["a1"]).unwrap().unwrap();
        assert_eq!(a1.path, Some(OrgPath::from_ids(vec![ids["a"], ids["a1"]]).unwrap()));
        assert_eq!(names(&store.descendants_of(ids["root"], false).unwrap()), vec!["b"]);
    }

    #[test]
    fn reparent_statement_count_independent_of_subtree_size() {
        fn cost(fanout: usize) -> u64 {
            let store = InMemoryTreeStore::new();
            let root = create(&store, "root", None).id;
            let moving = create(&store, "moving", Some(root)).id;
            let target = create(&store, "target", Some(root)).id;
            for i in 0..fanout {
                let mid = create(&store, &format!("mid-{i}"), Some(moving)).id;
                create(&store, &format!("leaf-{i}"), Some(mid));
            }
            let before = store.stats().statements;
            let receipt = store
                .apply_batch(WriteBatch::new().update_org_unit(
                    OrgUnit {
                        parent: Some(target),
                        ..store.org_unit(moving).unwrap().unwrap()
                    },
                    SaveOptions::default(),
                ))
                .unwrap();
            assert_eq!(receipt.cascaded_paths, fanout * 2);
            assert_path_invariant(&store, V1);
            store.stats().statements - before
        }

        assert_eq!(cost(2), cost(200));
    }

    #[test]
    fn reparent_under_own_descendant_is_rejected() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let err = store.reparent(ids["a"], Some(ids["a2x"])).unwrap_err();
        assert_eq!(
            err,
            StoreError::ParentCycle {
                org_unit: ids["a"],
                parent: ids["a2x"]
            }
        );
        let err = store.reparent(ids["a"], Some(ids["a"])).unwrap_err();
        assert!(matches!(err, StoreError::ParentCycle { .. }));
        assert_path_invariant(&store, V1);
    }

    #[test]
    fn reparent_under_pathless_parent_clears_subtree_paths() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let floating = store
            .create_org_unit(OrgUnitDraft::new(V1, "floating"), SaveOptions::skip_paths())
            .unwrap();
        store.reparent(ids["a"], Some(floating.id)).unwrap();
        for key in ["a", "a1", "a2", "a2x"] {
            assert!(store.org_unit(ids[key]).unwrap().unwrap().path.is_none(), "{key}");
        }
        assert_eq!(store.recompute_paths(V1).unwrap(), 5);
        assert_path_invariant(&store, V1);
    }

    #[test]
    fn skip_path_calculation_leaves_path_stale() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let mut a = store.org_unit(ids["a"]).unwrap().unwrap();
        let stale = a.path.clone();
        a.parent = Some(ids["b"]);
        let saved = store.save_org_unit(a, SaveOptions::skip_paths()).unwrap();
        assert_eq!(saved.path, stale);

        let changed = store.recompute_paths(V1).unwrap();
        assert_eq!(changed, 4);
        assert_path_invariant(&store, V1);
    }

    #[test]
    fn recompute_fills_paths_after_bulk_import() {
        let store = InMemoryTreeStore::new();
        let root = store
            .create_org_unit(OrgUnitDraft::new(V1, "root"), SaveOptions::skip_paths())
            .unwrap();
        let child = store
            .create_org_unit(
                OrgUnitDraft::new(V1, "child").with_parent(root.id),
                SaveOptions::skip_paths(),
            )
            .unwrap();
        assert_eq!(store.recompute_paths(V1).unwrap(), 2);
        let child = store.org_unit(child.id).unwrap().unwrap();
        assert_eq!(child.path, Some(OrgPath::from_ids(vec![root.id, child.id]).unwrap()));
        assert_eq!(store.recompute_paths(V1).unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Integrity constraints
    // -----------------------------------------------------------------------

    #[test]
    fn cross_version_parent_rejected() {
        let store = InMemoryTreeStore::new();
        let root = create(&store, "root", None);
        let err = store
            .create_org_unit(OrgUnitDraft::new(V2, "x").with_parent(root.id), SaveOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::CrossVersionParent { .. }));
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn cross_version_group_rejected() {
        let store = InMemoryTreeStore::new();
        let group = store.create_group(GroupDraft::new(V2, "Hospitals")).unwrap();
        let err = store
            .create_org_unit(OrgUnitDraft::new(V1, "x").with_group(group.id), SaveOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::CrossVersionGroup {
                org_unit: OrgUnitId::new(1),
                group: group.id
            }
        );
    }

    #[test]
    fn duplicate_active_code_rejected_within_version() {
        let store = InMemoryTreeStore::new();
        store
            .create_org_unit(OrgUnitDraft::new(V1, "a").with_code("X1"), SaveOptions::default())
            .unwrap();
        let err = store
            .create_org_unit(OrgUnitDraft::new(V1, "b").with_code("X1"), SaveOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCode { .. }));

        // Other versions and rejected units do not collide.
        store
            .create_org_unit(OrgUnitDraft::new(V2, "c").with_code("X1"), SaveOptions::default())
            .unwrap();
        store
            .create_org_unit(
                OrgUnitDraft::new(V1, "d")
                    .with_code("X1")
                    .with_status(ValidationStatus::Rejected),
                SaveOptions::default(),
            )
            .unwrap();
    }

    #[test]
    fn version_is_immutable() {
        let store = InMemoryTreeStore::new();
        let mut unit = create(&store, "a", None);
        unit.version = V2;
        let err = store.save_org_unit(unit, SaveOptions::default()).unwrap_err();
        assert_eq!(err, StoreError::VersionChange(OrgUnitId::new(1)));
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[test]
    fn batch_sees_its_own_inserts() {
        let store = InMemoryTreeStore::new();
        let group = store.allocate_group_id().unwrap();
        let parent_id = store.allocate_org_unit_id().unwrap();
        let child_id = store.allocate_org_unit_id().unwrap();
        let now = Utc::now();
        let parent = OrgUnit::from_draft(parent_id, OrgUnitDraft::new(V1, "district"), now);
        let child = OrgUnit::from_draft(
            child_id,
            OrgUnitDraft::new(V1, "facility")
                .with_parent(parent_id)
                .with_group(group),
            now,
        );
        let receipt = store
            .apply_batch(
                WriteBatch::new()
                    .insert_group(GroupDraft::new(V1, "g").into_group(group))
                    .insert_org_unit(parent, SaveOptions::default())
                    .insert_org_unit(child, SaveOptions::default()),
            )
            .unwrap();
        assert_eq!(receipt.org_units.len(), 2);
        assert_eq!(
            receipt.org_unit(child_id).unwrap().path,
            Some(OrgPath::from_ids(vec![parent_id, child_id]).unwrap())
        );
    }

    #[test]
    fn failed_batch_leaves_no_trace() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let before = store.org_units_in_version(V1).unwrap();

        let new_id = store.allocate_org_unit_id().unwrap();
        let fresh = OrgUnit::from_draft(new_id, OrgUnitDraft::new(V1, "fresh"), Utc::now());
        let moved = OrgUnit {
            parent: Some(ids["b"]),
            ..store.org_unit(ids["a"]).unwrap().unwrap()
        };
        let bad = OrgUnit::from_draft(
            store.allocate_org_unit_id().unwrap(),
            OrgUnitDraft::new(V2, "bad").with_parent(ids["root"]),
            Utc::now(),
        );
        let err = store
            .apply_batch(
                WriteBatch::new()
                    .insert_org_unit(fresh, SaveOptions::default())
                    .update_org_unit(moved, SaveOptions::default())
                    .insert_org_unit(bad, SaveOptions::default()),
            )
            .unwrap_err();
        assert!(err.is_integrity_violation());
        assert_eq!(store.org_units_in_version(V1).unwrap(), before);
        assert!(store.org_unit(new_id).unwrap().is_none());
        assert_eq!(store.stats().batches_rolled_back, 1);
        assert_eq!(names(&store.descendants_of(ids["a"], false).unwrap()), vec!["a1", "a2", "a2x"]);
    }

    #[test]
    fn revert_batch_restores_prior_state() {
        let store = InMemoryTreeStore::new();
        let ids = sample_tree(&store);
        let before = store.org_units_in_version(V1).unwrap();
        let moved = OrgUnit {
            parent: Some(ids["b"]),
            name: "renamed".into(),
            ..store.org_unit(ids["a"]).unwrap().unwrap()
        };
        let receipt = store
            .apply_batch(WriteBatch::new().update_org_unit(moved, SaveOptions::default()))
            .unwrap();
        store.revert_batch(&receipt).unwrap();
        assert_eq!(store.org_units_in_version(V1).unwrap(), before);
    }

    #[test]
    fn groups_listed_per_version() {
        let store = InMemoryTreeStore::new();
        store.create_group(GroupDraft::new(V1, "a")).unwrap();
        store.create_group(GroupDraft::new(V2, "b")).unwrap();
        store.create_group(GroupDraft::new(V1, "c")).unwrap();
        let v1: Vec<String> = store
            .groups_in_version(V1)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(v1, vec!["a", "c"]);
    }

    // -----------------------------------------------------------------------
    // Property: random reparenting keeps every computed path consistent
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn path_invariant_holds_under_random_moves(
            parents in proptest::collection::vec(any::<prop::sample::Index>(), 1..30),
            moves in proptest::collection::vec(
                (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
                0..30,
            ),
        ) {
            let store = InMemoryTreeStore::new();
            let mut ids = vec![create(&store, "n0", None).id];
            for (i, parent) in parents.iter().enumerate() {
                let parent = ids[parent.index(ids.len())];
                ids.push(create(&store, &format!("n{}", i + 1), Some(parent)).id);
            }
            for (unit, parent) in moves {
                let unit = ids[unit.index(ids.len())];
                let parent = ids[parent.index(ids.len())];
                match store.reparent(unit, Some(parent)) {
                    Ok(_) | Err(StoreError::ParentCycle { .. }) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
                assert_path_invariant(&store, V1);
            }
            let all_paths = store.descendants_of(ids[0], true).unwrap().len();
            let roots = store
                .org_units_in_version(V1)
                .unwrap()
                .into_iter()
                .filter(|u| u.parent.is_none())
                .count();
            prop_assert_eq!(roots, 1);
            prop_assert_eq!(all_paths, ids.len());
        }
    }
}
