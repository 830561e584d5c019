//! The [`VersionRegistry`] trait defining the version storage interface.

use orgsync_types::{DataSource, DataSourceId, SourceVersion, VersionId};

use crate::error::{RegistryError, RegistryResult};

/// Storage interface for data sources and their numbered versions.
///
/// Versions are never renumbered or moved between data sources once created.
pub trait VersionRegistry: Send + Sync {
    /// Create a named data source. The name is validated and must be unique.
    fn create_data_source(&self, name: &str, description: &str) -> RegistryResult<DataSource>;

    fn data_source(&self, id: DataSourceId) -> RegistryResult<Option<DataSource>>;

    /// All data sources, ordered by id.
    fn data_sources(&self) -> RegistryResult<Vec<DataSource>>;

    /// Create the next version of a data source (`number = max + 1`).
    ///
    /// The first version becomes the data source's default version.
    fn create_version(
        &self,
        data_source: DataSourceId,
        description: &str,
    ) -> RegistryResult<SourceVersion>;

    fn version(&self, id: VersionId) -> RegistryResult<Option<SourceVersion>>;

    /// Versions of a data source, ordered by number.
    fn versions_of(&self, data_source: DataSourceId) -> RegistryResult<Vec<SourceVersion>>;

    /// Point a data source at another of its versions.
    fn set_default_version(
        &self,
        data_source: DataSourceId,
        version: VersionId,
    ) -> RegistryResult<DataSource>;

    /// Read a version, failing if it does not exist.
    fn require_version(&self, id: VersionId) -> RegistryResult<SourceVersion> {
        self.version(id)?.ok_or(RegistryError::VersionNotFound(id))
    }

    /// Check that two versions can be compared: both exist, they share a
    /// data source, and they differ.
    fn ensure_comparable(
        &self,
        to_update: VersionId,
        compare_with: VersionId,
    ) -> RegistryResult<(SourceVersion, SourceVersion)> {
        if to_update == compare_with {
            return Err(RegistryError::SameVersion(to_update));
        }
        let a = self.require_version(to_update)?;
        let b = self.require_version(compare_with)?;
        if a.data_source != b.data_source {
            return Err(RegistryError::DifferentDataSources {
                a: to_update,
                b: compare_with,
            });
        }
        Ok((a, b))
    }
}
