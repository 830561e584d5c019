//! Materialized ancestry paths.
//!
//! An [`OrgPath`] is the ordered list of ancestor ids of an org unit, root
//! first, terminating in the unit's own id. Paths order lexicographically, so
//! every descendant of a path sorts in the contiguous range that starts at
//! the path itself. Stores rely on this to answer subtree queries with a
//! single range scan.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::OrgUnitId;

/// Serialized as the bare id array; deserialization goes through
/// [`OrgPath::from_ids`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<OrgUnitId>", into = "Vec<OrgUnitId>")]
pub struct OrgPath(Vec<OrgUnitId>);

impl OrgPath {
    /// Path of a root unit.
    pub fn root(id: OrgUnitId) -> Self {
        Self(vec![id])
    }

    /// Build a path from ancestor ids. Fails on an empty sequence or when an
    /// id appears twice.
    pub fn from_ids(ids: Vec<OrgUnitId>) -> Result<Self, TypeError> {
        if ids.is_empty() {
            return Err(TypeError::InvalidPath("path must not be empty".into()));
        }
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(TypeError::InvalidPath(format!("{id} appears twice")));
            }
        }
        Ok(Self(ids))
    }

    /// Path of a child of this path.
    pub fn child(&self, id: OrgUnitId) -> Self {
        let mut ids = Vec::with_capacity(self.0.len() + 1);
        ids.extend_from_slice(&self.0);
        ids.push(id);
        Self(ids)
    }

    /// The unit this path terminates in.
    pub fn leaf(&self) -> OrgUnitId {
        // Non-empty by construction.
        self.0[self.0.len() - 1]
    }

    /// The topmost ancestor.
    pub fn root_id(&self) -> OrgUnitId {
        self.0[0]
    }

    /// Number of levels, a root has depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn ids(&self) -> &[OrgUnitId] {
        &self.0
    }

    /// Ancestor ids, excluding the leaf.
    pub fn ancestors(&self) -> &[OrgUnitId] {
        &self.0[..self.0.len() - 1]
    }

    pub fn contains(&self, id: OrgUnitId) -> bool {
        self.0.contains(&id)
    }

    /// `true` if `self` is a prefix of `other` (a unit is its own descendant).
    pub fn is_prefix_of(&self, other: &OrgPath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Replace the leading `old_prefix` of this path with `new_prefix`.
    ///
    /// Returns `None` when `old_prefix` is not a prefix of `self`.
    pub fn rebase(&self, old_prefix: &OrgPath, new_prefix: &OrgPath) -> Option<OrgPath> {
        if !old_prefix.is_prefix_of(self) {
            return None;
        }
        let mut ids = Vec::with_capacity(new_prefix.depth() + self.depth() - old_prefix.depth());
        ids.extend_from_slice(&new_prefix.0);
        ids.extend_from_slice(&self.0[old_prefix.depth()..]);
        Some(Self(ids))
    }
}

impl TryFrom<Vec<OrgUnitId>> for OrgPath {
    type Error = TypeError;

    fn try_from(ids: Vec<OrgUnitId>) -> Result<Self, Self::Error> {
        Self::from_ids(ids)
    }
}

impl From<OrgPath> for Vec<OrgUnitId> {
    fn from(path: OrgPath) -> Self {
        path.0
    }
}

impl fmt::Debug for OrgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrgPath({self})")
    }
}

/// Dotted rendering: `1.4.9`.
impl fmt::Display for OrgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", id.get())?;
        }
        Ok(())
    }
}

impl FromStr for OrgPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ids = s
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map(OrgUnitId::new)
                    .map_err(|_| TypeError::InvalidPath(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_ids(ids)
    }
}
