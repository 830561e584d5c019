//! Atomic write batches.
//!
//! A [`WriteBatch`] is an ordered list of inserts and updates applied as one
//! unit: either every operation lands or none does. Operations see the
//! effects of earlier operations of the same batch, so a batch may insert a
//! parent and then a child pointing at it.
//!
//! Applying a batch yields a [`BatchReceipt`] carrying the undo log. A caller
//! whose unit of work spans more than one store can hand the receipt back to
//! [`TreeStore::revert_batch`](crate::TreeStore::revert_batch) when a later
//! step fails.

use orgsync_types::{Group, GroupId, OrgUnit, OrgUnitId};

/// Per-write options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Leave the materialized path untouched. Used by bulk imports, which
    /// recompute all paths once at the end; ancestor and descendant queries
    /// see stale paths until then.
    pub skip_path_calculation: bool,
}

impl SaveOptions {
    pub fn skip_paths() -> Self {
        Self {
            skip_path_calculation: true,
        }
    }
}

/// A single write inside a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    InsertGroup(Group),
    InsertOrgUnit { unit: OrgUnit, options: SaveOptions },
    UpdateOrgUnit { unit: OrgUnit, options: SaveOptions },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_group(mut self, group: Group) -> Self {
        self.ops.push(WriteOp::InsertGroup(group));
        self
    }

    pub fn insert_org_unit(mut self, unit: OrgUnit, options: SaveOptions) -> Self {
        self.ops.push(WriteOp::InsertOrgUnit { unit, options });
        self
    }

    pub fn update_org_unit(mut self, unit: OrgUnit, options: SaveOptions) -> Self {
        self.ops.push(WriteOp::UpdateOrgUnit { unit, options });
        self
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Prior state of one record touched by a batch.
#[derive(Clone, Debug, PartialEq)]
pub enum UndoEntry {
    OrgUnit { id: OrgUnitId, prior: Option<OrgUnit> },
    Group { id: GroupId, prior: Option<Group> },
}

/// Outcome of a committed batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReceipt {
    /// Final state of every org unit written by an explicit operation, in
    /// operation order. Units touched only by a path cascade are not listed.
    pub org_units: Vec<OrgUnit>,
    /// Groups inserted, in operation order.
    pub groups: Vec<Group>,
    /// Number of descendant paths rewritten by cascades.
    pub cascaded_paths: usize,
    /// Undo log, oldest first.
    pub undo: Vec<UndoEntry>,
}

impl BatchReceipt {
    /// Final state of the org unit written by the given id, if any.
    pub fn org_unit(&self, id: OrgUnitId) -> Option<&OrgUnit> {
        self.org_units.iter().find(|u| u.id == id)
    }
}
