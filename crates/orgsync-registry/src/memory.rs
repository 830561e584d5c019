//! In-memory version registry for testing and embedding.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use orgsync_types::{DataSource, DataSourceId, SourceVersion, VersionId};
use tracing::info;

use crate::error::{RegistryError, RegistryResult};
use crate::names::validate_data_source_name;
use crate::traits::VersionRegistry;

#[derive(Debug, Default)]
struct RegistryState {
    sources: BTreeMap<DataSourceId, DataSource>,
    versions: BTreeMap<VersionId, SourceVersion>,
}

/// An in-memory implementation of [`VersionRegistry`].
#[derive(Debug)]
pub struct InMemoryVersionRegistry {
    state: RwLock<RegistryState>,
    next_source: AtomicU64,
    next_version: AtomicU64,
}

impl InMemoryVersionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            next_source: AtomicU64::new(1),
            next_version: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryVersionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionRegistry for InMemoryVersionRegistry {
    fn create_data_source(&self, name: &str, description: &str) -> RegistryResult<DataSource> {
        let name = validate_data_source_name(name)?;
        let mut state = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;
        if state.sources.values().any(|s| s.name == name) {
            return Err(RegistryError::DataSourceExists {
                name: name.to_string(),
            });
        }
        let source = DataSource {
            id: DataSourceId::new(self.next_source.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            description: description.to_string(),
            default_version: None,
            created_at: Utc::now(),
        };
        state.sources.insert(source.id, source.clone());
        info!(data_source = %source.id, name = %source.name, "data source created");
        Ok(source)
    }

    fn data_source(&self, id: DataSourceId) -> RegistryResult<Option<DataSource>> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.sources.get(&id).cloned())
    }

    fn data_sources(&self) -> RegistryResult<Vec<DataSource>> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.sources.values().cloned().collect())
    }

    fn create_version(
        &self,
        data_source: DataSourceId,
        description: &str,
    ) -> RegistryResult<SourceVersion> {
        let mut state = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;
        if !state.sources.contains_key(&data_source) {
            return Err(RegistryError::DataSourceNotFound(data_source));
        }
        let number = state
            .versions
            .values()
            .filter(|v| v.data_source == data_source)
            .map(|v| v.number)
            .max()
            .unwrap_or(0)
            + 1;
        let version = SourceVersion {
            id: VersionId::new(self.next_version.fetch_add(1, Ordering::Relaxed)),
            data_source,
            number,
            description: description.to_string(),
            created_at: Utc::now(),
        };
        state.versions.insert(version.id, version.clone());
        if let Some(source) = state.sources.get_mut(&data_source) {
            source.default_version.get_or_insert(version.id);
        }
        info!(
            data_source = %data_source,
            version = %version.id,
            number,
            "version created"
        );
        Ok(version)
    }

    fn version(&self, id: VersionId) -> RegistryResult<Option<SourceVersion>> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.versions.get(&id).cloned())
    }

    fn versions_of(&self, data_source: DataSourceId) -> RegistryResult<Vec<SourceVersion>> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        let mut versions: Vec<SourceVersion> = state
            .versions
            .values()
            .filter(|v| v.data_source == data_source)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.number);
        Ok(versions)
    }

    fn set_default_version(
        &self,
        data_source: DataSourceId,
        version: VersionId,
    ) -> RegistryResult<DataSource> {
        let mut state = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;
        let owner = state
            .versions
            .get(&version)
            .map(|v| v.data_source)
            .ok_or(RegistryError::VersionNotFound(version))?;
        if owner != data_source {
            return Err(RegistryError::ForeignVersion {
                version,
                data_source,
            });
        }
        let source = state
            .sources
            .get_mut(&data_source)
            .ok_or(RegistryError::DataSourceNotFound(data_source))?;
        source.default_version = Some(version);
        Ok(source.clone())
    }
}
