//! Version registry for org-unit hierarchies.
//!
//! A data source owns a numbered sequence of versions; every org unit and
//! group belongs to exactly one version. Versions are compared pairwise and
//! never merged in place.
//!
//! # Modules
//!
//! - [`error`]: Error types for registry operations
//! - [`traits`]: The [`VersionRegistry`] trait defining the storage interface
//! - [`names`]: Data source name validation
//! - [`filter`]: [`OrgUnitFilter`] and version-scoped org unit queries
//! - [`memory`]: In-memory [`InMemoryVersionRegistry`] for tests

pub mod error;
pub mod filter;
pub mod memory;
pub mod names;
pub mod traits;

pub use error::{RegistryError, RegistryResult};
pub use filter::{count_org_units, org_units_matching, OrgUnitFilter};
pub use memory::InMemoryVersionRegistry;
pub use names::validate_data_source_name;
pub use traits::VersionRegistry;
