//! High-level SDK for orgsync.
//!
//! [`OrgSync`] wires the tree store, version registry, differ,
//! synchronization service and review workflow behind one API. This is the
//! main entry point for applications embedding the engine.
//!
//! ```rust
//! use orgsync_sdk::{OrgSync, OrgUnitDraft};
//!
//! let engine = OrgSync::in_memory();
//! let ds = engine.create_data_source("Angola", "").unwrap();
//! let v1 = engine.create_version(ds.id, "").unwrap();
//! let v2 = engine.create_version(ds.id, "").unwrap();
//! engine.create_org_unit(OrgUnitDraft::new(v2.id, "Luanda").with_source_ref("id-2")).unwrap();
//!
//! let sync = engine.create_synchronization("v1 <- v2", v1.id, v2.id, None).unwrap();
//! engine.create_json_diff(sync.id, None).unwrap();
//! let report = engine.synchronize_source_versions(sync.id, None).unwrap();
//! assert_eq!(report.created_org_units.len(), 1);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;

pub use config::{DiffDefaults, EngineConfig, LoggingConfig};
pub use engine::OrgSync;
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use orgsync_changes::{ChangeProposal, FieldValues, ProposalField, ProposalQuery, ProposalStatus};
pub use orgsync_diff::{DiffConfig, DiffDocument, DiffField};
pub use orgsync_registry::OrgUnitFilter;
pub use orgsync_review::{AllowAll, AllowList, ReviewConfig};
pub use orgsync_sync::{SyncReport, Synchronization};
pub use orgsync_types::{
    GroupDraft, OrgPath, OrgUnit, OrgUnitDraft, OrgUnitId, UserId, ValidationStatus, VersionId,
};
