//! Field value snapshots carried by a change proposal.
//!
//! A proposal holds two [`FieldValues`]: the `old` snapshot, frozen when the
//! proposal is created, and the `new` proposed values. Whether a field is
//! touched at all is decided by the proposal's field sets, never by the
//! value: an empty value inside an approved field erases the live value,
//! while a field outside the approved set leaves it alone.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use orgsync_types::{
    GroupId, InstanceId, MultiPolygon, OrgUnit, OrgUnitId, OrgUnitTypeId, Point,
};
use serde::{Deserialize, Serialize};

use crate::field::ProposalField;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValues {
    pub name: Option<String>,
    pub parent: Option<OrgUnitId>,
    pub org_unit_type: Option<OrgUnitTypeId>,
    pub groups: BTreeSet<GroupId>,
    pub location: Option<Point>,
    pub opening_date: Option<NaiveDate>,
    pub closed_date: Option<NaiveDate>,
    pub reference_instances: BTreeSet<InstanceId>,
    #[serde(default)]
    pub geometry: Option<MultiPolygon>,
}

impl FieldValues {
    /// Every editable value of `unit`.
    pub fn snapshot(unit: &OrgUnit) -> Self {
        Self {
            name: Some(unit.name.clone()),
            parent: unit.parent,
            org_unit_type: unit.org_unit_type,
            groups: unit.groups.clone(),
            location: unit.location,
            opening_date: unit.opening_date,
            closed_date: unit.closed_date,
            reference_instances: unit.reference_instances.clone(),
            geometry: unit.geometry.clone(),
        }
    }

    /// Fields carrying a value. `name` counts whenever it is set, even
    /// blank, so a creation always has something to approve.
    pub fn populated_fields(&self) -> BTreeSet<ProposalField> {
        ProposalField::ALL
            .into_iter()
            .filter(|field| match field {
                ProposalField::Name => self.name.is_some(),
                ProposalField::Parent => self.parent.is_some(),
                ProposalField::OrgUnitType => self.org_unit_type.is_some(),
                ProposalField::Groups => !self.groups.is_empty(),
                ProposalField::Location => self.location.is_some(),
                ProposalField::OpeningDate => self.opening_date.is_some(),
                ProposalField::ClosedDate => self.closed_date.is_some(),
                ProposalField::ReferenceInstances => !self.reference_instances.is_empty(),
                ProposalField::Geometry => self.geometry.is_some(),
            })
            .collect()
    }

    /// Keep only the values of `fields`; every other value is reset.
    pub fn restricted_to(&self, fields: &BTreeSet<ProposalField>) -> Self {
        let mut out = Self::default();
        for field in fields {
            out.copy_field(self, *field);
        }
        out
    }

    fn copy_field(&mut self, from: &FieldValues, field: ProposalField) {
        match field {
            ProposalField::Name => self.name = from.name.clone(),
            ProposalField::Parent => self.parent = from.parent,
            ProposalField::OrgUnitType => self.org_unit_type = from.org_unit_type,
            ProposalField::Groups => self.groups = from.groups.clone(),
            ProposalField::Location => self.location = from.location,
            ProposalField::OpeningDate => self.opening_date = from.opening_date,
            ProposalField::ClosedDate => self.closed_date = from.closed_date,
            ProposalField::ReferenceInstances => {
                self.reference_instances = from.reference_instances.clone()
            }
            ProposalField::Geometry => self.geometry = from.geometry.clone(),
        }
    }

    /// Write the values of `fields` onto `unit`.
    ///
    /// Empty values erase. Groups and reference instances replace the live
    /// sets wholesale.
    pub fn apply_to(&self, unit: &mut OrgUnit, fields: &BTreeSet<ProposalField>) {
        for field in fields {
            match field {
                ProposalField::Name => unit.name = self.name.clone().unwrap_or_default(),
                ProposalField::Parent => unit.parent = self.parent,
                ProposalField::OrgUnitType => unit.org_unit_type = self.org_unit_type,
                ProposalField::Groups => unit.groups = self.groups.clone(),
                ProposalField::Location => unit.location = self.location,
                ProposalField::OpeningDate => unit.opening_date = self.opening_date,
                ProposalField::ClosedDate => unit.closed_date = self.closed_date,
                ProposalField::ReferenceInstances => {
                    unit.reference_instances = self.reference_instances.clone()
                }
                ProposalField::Geometry => unit.geometry = self.geometry.clone(),
            }
        }
    }

    /// `true` if no value is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
