//! Org-unit tree storage for the orgsync engine.
//!
//! Org units and groups are stored per version. Every org unit carries a
//! materialized path (root first, ending in its own id) so that ancestor and
//! descendant lookups are a single read instead of a recursive walk.
//!
//! # Storage Backends
//!
//! All backends implement the [`TreeStore`] trait:
//!
//! - [`InMemoryTreeStore`] -- `BTreeMap`-indexed store for tests and embedding
//!
//! # Design Rules
//!
//! 1. A computed path equals the parent's path plus the unit's own id.
//! 2. Reparenting rewrites the whole subtree in one bulk statement.
//! 3. Parents and group memberships never cross versions.
//! 4. Writes go through [`WriteBatch`] and are all-or-nothing.
//! 5. Writers may opt out of path maintenance ([`SaveOptions`]) and call
//!    [`TreeStore::recompute_paths`] once afterwards.

pub mod batch;
pub mod error;
pub mod memory;
pub mod traits;

pub use batch::{BatchReceipt, SaveOptions, UndoEntry, WriteBatch, WriteOp};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryTreeStore;
pub use traits::{StoreStats, TreeStore};
