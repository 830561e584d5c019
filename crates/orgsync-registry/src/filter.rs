//! Version-scoped org unit queries used to build diff candidate sets.

use orgsync_store::TreeStore;
use orgsync_types::{GroupId, OrgUnit, OrgUnitId, OrgUnitTypeId, ValidationStatus, VersionId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};

/// Restricts the org units of a version taking part in a comparison.
///
/// Every criterion is optional; an empty filter matches the whole version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnitFilter {
    #[serde(default)]
    pub validation_status: Option<ValidationStatus>,
    /// Subtree root. The root itself is included.
    #[serde(default)]
    pub top_org_unit: Option<OrgUnitId>,
    /// Accepted org unit types. Empty means any type.
    #[serde(default)]
    pub org_unit_types: Vec<OrgUnitTypeId>,
    #[serde(default)]
    pub group: Option<GroupId>,
}

impl OrgUnitFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: ValidationStatus) -> Self {
        self.validation_status = Some(status);
        self
    }

    pub fn under(mut self, top_org_unit: OrgUnitId) -> Self {
        self.top_org_unit = Some(top_org_unit);
        self
    }

    pub fn with_type(mut self, org_unit_type: OrgUnitTypeId) -> Self {
        self.org_unit_types.push(org_unit_type);
        self
    }

    pub fn in_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    /// Same filter with the type list sorted and deduplicated, so that
    /// equivalent filters serialize identically.
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.org_unit_types.sort();
        normalized.org_unit_types.dedup();
        normalized
    }

    fn accepts(&self, unit: &OrgUnit) -> bool {
        if let Some(status) = self.validation_status {
            if unit.validation_status != status {
                return false;
            }
        }
        if !self.org_unit_types.is_empty() {
            match unit.org_unit_type {
                Some(t) if self.org_unit_types.contains(&t) => {}
                _ => return false,
            }
        }
        if let Some(group) = self.group {
            if !unit.groups.contains(&group) {
                return false;
            }
        }
        true
    }
}

/// Org units of `version` passing `filter`, ordered by id.
///
/// A subtree restriction is answered through the materialized path, so org
/// units whose path has not been computed are not found under a subtree root.
pub fn org_units_matching<S>(
    store: &S,
    version: VersionId,
    filter: &OrgUnitFilter,
) -> RegistryResult<Vec<OrgUnit>>
where
    S: TreeStore + ?Sized,
{
    if let Some(group_id) = filter.group {
        match store.group(group_id)? {
            Some(group) if group.version == version => {}
            _ => {
                return Err(RegistryError::FilterOutsideVersion {
                    filter: "group",
                    version,
                })
            }
        }
    }

    let candidates = match filter.top_org_unit {
        Some(top) => {
            match store.org_unit(top)? {
                Some(unit) if unit.version == version => {}
                _ => {
                    return Err(RegistryError::FilterOutsideVersion {
                        filter: "top_org_unit",
                        version,
                    })
                }
            }
            let mut units = store.descendants_of(top, true)?;
            units.sort_by_key(|u| u.id);
            units
        }
        None => store.org_units_in_version(version)?,
    };

    let total = candidates.len();
    let matching: Vec<OrgUnit> = candidates
        .into_iter()
        .filter(|u| filter.accepts(u))
        .collect();
    debug!(
        version = %version,
        scanned = total,
        matched = matching.len(),
        "filtered org units"
    );
    Ok(matching)
}

/// Number of org units in a version.
pub fn count_org_units<S>(store: &S, version: VersionId) -> RegistryResult<usize>
where
    S: TreeStore + ?Sized,
{
    Ok(store.org_units_in_version(version)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgsync_store::{InMemoryTreeStore, SaveOptions};
    use orgsync_types::{GroupDraft, OrgUnitDraft};

    const V1: VersionId = VersionId::new(1);
    const V2: VersionId = VersionId::new(2);
    const REGION: OrgUnitTypeId = OrgUnitTypeId::new(2);
    const DISTRICT: OrgUnitTypeId = OrgUnitTypeId::new(3);

    struct Fixture {
        store: InMemoryTreeStore,
        country: OrgUnitId,
        north: OrgUnitId,
        hospitals: GroupId,
    }

    fn fixture() -> Fixture {
        let store = InMemoryTreeStore::new();
        let hospitals = store.create_group(GroupDraft::new(V1, "Hospitals")).unwrap().id;
        let save = |draft: OrgUnitDraft| store.create_org_unit(draft, SaveOptions::default()).unwrap().id;
        let country = save(OrgUnitDraft::new(V1, "Angola"));
        let north = save(OrgUnitDraft::new(V1, "North").with_parent(country).with_type(REGION));
        save(
            OrgUnitDraft::new(V1, "North district")
                .with_parent(north)
                .with_type(DISTRICT)
                .with_group(hospitals),
        );
        let south = save(OrgUnitDraft::new(V1, "South").with_parent(country).with_type(REGION));
        save(
            OrgUnitDraft::new(V1, "South district")
                .with_parent(south)
                .with_type(DISTRICT)
                .with_status(ValidationStatus::New),
        );
        save(OrgUnitDraft::new(V2, "Other version"));
        Fixture {
            store,
            country,
            north,
            hospitals,
        }
    }

    fn names(units: &[OrgUnit]) -> Vec<&str> {
        units.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn empty_filter_matches_whole_version() {
        let f = fixture();
        let units = org_units_matching(&f.store, V1, &OrgUnitFilter::new()).unwrap();
        assert_eq!(units.len(), 5);
        assert_eq!(count_org_units(&f.store, V1).unwrap(), 5);
        assert_eq!(count_org_units(&f.store, V2).unwrap(), 1);
    }

    #[test]
    fn filter_by_status() {
        let f = fixture();
        let filter = OrgUnitFilter::new().with_status(ValidationStatus::New);
        let units = org_units_matching(&f.store, V1, &filter).unwrap();
        assert_eq!(names(&units), vec!["South district"]);
    }

    #[test]
    fn filter_by_subtree_includes_root() {
        let f = fixture();
        let filter = OrgUnitFilter::new().under(f.north);
        let units = org_units_matching(&f.store, V1, &filter).unwrap();
        assert_eq!(names(&units), vec!["North", "North district"]);
    }

    #[test]
    fn filter_by_type_and_group() {
        let f = fixture();
        let districts = OrgUnitFilter::new().with_type(DISTRICT);
        assert_eq!(org_units_matching(&f.store, V1, &districts).unwrap().len(), 2);

        let regions_or_districts = OrgUnitFilter::new().with_type(REGION).with_type(DISTRICT);
        assert_eq!(org_units_matching(&f.store, V1, &regions_or_districts).unwrap().len(), 4);

        let hospitals = OrgUnitFilter::new().in_group(f.hospitals);
        let units = org_units_matching(&f.store, V1, &hospitals).unwrap();
        assert_eq!(names(&units), vec!["North district"]);
    }

    #[test]
    fn combined_criteria() {
        let f = fixture();
        let filter = OrgUnitFilter::new()
            .under(f.country)
            .with_type(DISTRICT)
            .with_status(ValidationStatus::Valid);
        let units = org_units_matching(&f.store, V1, &filter).unwrap();
        assert_eq!(names(&units), vec!["North district"]);
    }

    #[test]
    fn filter_references_must_belong_to_version() {
        let f = fixture();
        let err = org_units_matching(&f.store, V2, &OrgUnitFilter::new().under(f.north)).unwrap_err();
        assert_eq!(err.field(), Some("top_org_unit"));

        let err = org_units_matching(&f.store, V2, &OrgUnitFilter::new().in_group(f.hospitals))
            .unwrap_err();
        assert_eq!(err.field(), Some("group"));
    }

    #[test]
    fn normalized_filters_serialize_identically() {
        let a = OrgUnitFilter::new().with_type(DISTRICT).with_type(REGION).with_type(DISTRICT);
        let b = OrgUnitFilter::new().with_type(REGION).with_type(DISTRICT);
        assert_eq!(
            serde_json::to_string(&a.normalized()).unwrap(),
            serde_json::to_string(&b.normalized()).unwrap()
        );
    }
}
