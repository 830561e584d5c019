//! Foundation types for org-unit synchronization.
//!
//! This crate provides the identifiers, records, and value types shared by
//! every other crate of the workspace: the tree store, the version registry,
//! the differ, the change-proposal generator, and the review workflow.
//!
//! # Key Types
//!
//! - [`OrgUnit`] / [`OrgUnitDraft`]: a node of the administrative hierarchy
//! - [`OrgPath`]: materialized ancestry path (root first, self last)
//! - [`SourceVersion`] / [`DataSource`]: numbered hierarchy snapshots
//! - [`Group`]: version-scoped set of org units
//! - [`SourceRef`]: external identifier matching units across versions
//! - [`Point`] / [`MultiPolygon`]: locations and shapes

pub mod error;
pub mod geometry;
pub mod ids;
pub mod org_unit;
pub mod path;
pub mod version;

pub use error::TypeError;
pub use geometry::{same_geometry, same_location, MultiPolygon, Point, Polygon, Ring};
pub use ids::{
    DataSourceId, GroupId, InstanceId, OrgUnitId, OrgUnitTypeId, ProposalId, SourceRef,
    SynchronizationId, UserId, VersionId,
};
pub use org_unit::{OrgUnit, OrgUnitDraft, ValidationStatus};
pub use path::OrgPath;
pub use version::{DataSource, Group, GroupDraft, SourceVersion};
