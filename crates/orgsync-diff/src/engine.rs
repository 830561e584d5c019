//! Version comparison.
//!
//! Org units are matched across versions by `source_ref` through an index
//! built once per side. Internal ids never take part in matching: parents
//! are compared by their own `source_ref`, groups by their names.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use orgsync_registry::{org_units_matching, OrgUnitFilter};
use orgsync_store::TreeStore;
use orgsync_types::{
    same_geometry, same_location, GroupId, OrgPath, OrgUnit, OrgUnitId, SourceRef, VersionId,
};
use serde_json::Value;
use similar::TextDiff;
use tracing::{debug, info, warn};

use crate::config::DiffConfig;
use crate::document::{ComparisonStatus, DiffDocument, DiffEntry, EntryStatus, FieldComparison};
use crate::error::{DiffError, DiffResult};
use crate::field::DiffField;

/// Candidate org units of one version, indexed for matching.
struct Side {
    by_ref: BTreeMap<SourceRef, OrgUnit>,
    parent_refs: HashMap<OrgUnitId, SourceRef>,
    group_names: HashMap<GroupId, String>,
}

impl Side {
    fn load<S>(
        store: &S,
        version: VersionId,
        filter: &OrgUnitFilter,
        label: &'static str,
    ) -> DiffResult<Self>
    where
        S: TreeStore + ?Sized,
    {
        let candidates = org_units_matching(store, version, filter)?;

        // Candidates arrive ordered by id, so the first unit seen for a
        // source_ref is the one with the lowest id.
        let mut by_ref: BTreeMap<SourceRef, OrgUnit> = BTreeMap::new();
        let mut blank = 0usize;
        for unit in candidates {
            let Some(source_ref) = unit.source_ref.clone() else {
                blank += 1;
                continue;
            };
            if let Some(kept) = by_ref.get(&source_ref) {
                warn!(
                    side = label,
                    source_ref = %source_ref,
                    kept = %kept.id,
                    ignored = %unit.id,
                    "duplicate source_ref, keeping the lowest id"
                );
                continue;
            }
            by_ref.insert(source_ref, unit);
        }
        if blank > 0 {
            debug!(side = label, skipped = blank, "org units without source_ref ignored");
        }

        let parent_ids: Vec<OrgUnitId> = by_ref
            .values()
            .filter_map(|u| u.parent)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let parent_refs = store
            .org_units(&parent_ids)?
            .into_iter()
            .filter_map(|p| p.source_ref.map(|r| (p.id, r)))
            .collect();

        let group_names = store
            .groups_in_version(version)?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect();

        Ok(Self {
            by_ref,
            parent_refs,
            group_names,
        })
    }

    fn value(&self, unit: &OrgUnit, field: DiffField) -> DiffResult<Value> {
        let value = match field {
            DiffField::Name => Value::String(unit.name.clone()),
            DiffField::Parent => unit
                .parent
                .and_then(|p| self.parent_refs.get(&p))
                .map(|r| Value::String(r.as_str().to_string()))
                .unwrap_or(Value::Null),
            DiffField::OrgUnitType => unit
                .org_unit_type
                .map(|t| Value::from(t.get()))
                .unwrap_or(Value::Null),
            DiffField::OpeningDate => date_value(unit.opening_date),
            DiffField::ClosedDate => date_value(unit.closed_date),
            DiffField::Location => match &unit.location {
                Some(point) => serde_json::to_value(point)
                    .map_err(|e| DiffError::Serialization(e.to_string()))?,
                None => Value::Null,
            },
            DiffField::Groups => {
                let names: BTreeSet<&str> = unit
                    .groups
                    .iter()
                    .filter_map(|g| self.group_names.get(g).map(String::as_str))
                    .collect();
                Value::from(names.into_iter().collect::<Vec<_>>())
            }
            DiffField::Geometry => match &unit.geometry {
                Some(shape) if !shape.is_empty() => serde_json::to_value(shape)
                    .map_err(|e| DiffError::Serialization(e.to_string()))?,
                _ => Value::Null,
            },
        };
        Ok(value)
    }
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// `1 - similarity ratio` over characters, rounded to four decimals.
pub fn name_distance(before: &str, after: &str) -> f64 {
    let ratio = f64::from(TextDiff::from_chars(before, after).ratio());
    ((1.0 - ratio) * 10_000.0).round() / 10_000.0
}

fn compare(
    field: DiffField,
    old_unit: &OrgUnit,
    new_unit: &OrgUnit,
    before: Value,
    after: Value,
) -> FieldComparison {
    let same = match field {
        DiffField::Location => same_location(old_unit.location.as_ref(), new_unit.location.as_ref()),
        DiffField::Geometry => same_geometry(
            old_unit.geometry.as_ref().filter(|g| !g.is_empty()),
            new_unit.geometry.as_ref().filter(|g| !g.is_empty()),
        ),
        _ => before == after,
    };
    let distance = match (field, same) {
        (DiffField::Name, false) => Some(name_distance(&old_unit.name, &new_unit.name)),
        _ => None,
    };
    FieldComparison {
        field,
        before,
        after,
        status: if same {
            ComparisonStatus::Unchanged
        } else {
            ComparisonStatus::Modified
        },
        distance,
    }
}

/// Compare two versions and produce the diff document.
///
/// Only org units with a `source_ref` take part. A compare-with unit without
/// a counterpart yields a `new` entry; a matched pair yields a `modified`
/// entry when at least one compared field differs, and nothing otherwise.
/// Entries are ordered by the compare-with unit's depth, then `source_ref`,
/// so parents precede their children.
pub fn compute_diff<S>(
    store: &S,
    version_to_update: VersionId,
    version_to_compare_with: VersionId,
    config: &DiffConfig,
) -> DiffResult<DiffDocument>
where
    S: TreeStore + ?Sized,
{
    let fields = config.effective_fields();
    let target = Side::load(store, version_to_update, &config.to_update, "to_update")?;
    let source = Side::load(
        store,
        version_to_compare_with,
        &config.compare_with,
        "compare_with",
    )?;

    let mut ordered: Vec<(&SourceRef, &OrgUnit)> = source.by_ref.iter().collect();
    ordered.sort_by_key(|(source_ref, unit)| {
        (
            unit.path.as_ref().map(OrgPath::depth).unwrap_or(usize::MAX),
            (*source_ref).clone(),
        )
    });

    let mut entries = Vec::new();
    for (source_ref, new_unit) in ordered {
        match target.by_ref.get(source_ref) {
            None => {
                let mut comparisons = Vec::with_capacity(fields.len());
                for field in &fields {
                    let after = source.value(new_unit, *field)?;
                    let status = if is_blank(&after) {
                        ComparisonStatus::Unchanged
                    } else {
                        ComparisonStatus::Modified
                    };
                    comparisons.push(FieldComparison {
                        field: *field,
                        before: Value::Null,
                        after,
                        status,
                        distance: None,
                    });
                }
                entries.push(DiffEntry {
                    source_ref: source_ref.clone(),
                    status: EntryStatus::New,
                    comparisons,
                });
            }
            Some(old_unit) => {
                let mut comparisons = Vec::with_capacity(fields.len());
                for field in &fields {
                    let before = target.value(old_unit, *field)?;
                    let after = source.value(new_unit, *field)?;
                    comparisons.push(compare(*field, old_unit, new_unit, before, after));
                }
                if comparisons.iter().any(FieldComparison::is_modified) {
                    entries.push(DiffEntry {
                        source_ref: source_ref.clone(),
                        status: EntryStatus::Modified,
                        comparisons,
                    });
                }
            }
        }
    }

    let document = DiffDocument::new(entries);
    info!(
        to_update = %version_to_update,
        compare_with = %version_to_compare_with,
        create = document.count_create(),
        update = document.count_update(),
        "diff computed"
    );
    Ok(document)
}
