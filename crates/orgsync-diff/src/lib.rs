//! Field-level comparison of two org-unit hierarchy versions.
//!
//! The differ is a pure read-and-compute step: it selects candidate org
//! units on both sides, matches them by `source_ref`, and reports every
//! unmatched or differing unit as an entry of a [`DiffDocument`].
//!
//! # Key Types
//!
//! - [`DiffConfig`] -- filters, field allowlist, canonical string and fingerprint
//! - [`DiffDocument`] / [`DiffEntry`] / [`FieldComparison`] -- the persisted diff
//! - [`DiffField`] -- closed set of comparable fields

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod field;

pub use config::DiffConfig;
pub use document::{ComparisonStatus, DiffDocument, DiffEntry, EntryStatus, FieldComparison};
pub use engine::{compute_diff, name_distance};
pub use error::{DiffError, DiffResult};
pub use field::DiffField;
