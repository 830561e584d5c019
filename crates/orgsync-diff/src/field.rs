use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiffError;

/// A comparable org unit field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffField {
    Name,
    /// Compared by the parent's `source_ref`, never by internal id.
    Parent,
    OrgUnitType,
    OpeningDate,
    ClosedDate,
    Location,
    /// Compared as the set of group names.
    Groups,
    /// Polygon shape. Only compared when named in the field list.
    Geometry,
}

impl DiffField {
    /// Every comparable field, in comparison order.
    pub const ALL: [DiffField; 8] = [
        DiffField::Name,
        DiffField::Parent,
        DiffField::OrgUnitType,
        DiffField::OpeningDate,
        DiffField::ClosedDate,
        DiffField::Location,
        DiffField::Groups,
        DiffField::Geometry,
    ];

    /// Fields compared when no field list is given.
    pub const DEFAULT: [DiffField; 7] = [
        DiffField::Name,
        DiffField::Parent,
        DiffField::OrgUnitType,
        DiffField::OpeningDate,
        DiffField::ClosedDate,
        DiffField::Location,
        DiffField::Groups,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Parent => "parent",
            Self::OrgUnitType => "org_unit_type",
            Self::OpeningDate => "opening_date",
            Self::ClosedDate => "closed_date",
            Self::Location => "location",
            Self::Groups => "groups",
            Self::Geometry => "geometry",
        }
    }
}

impl fmt::Display for DiffField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffField {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| DiffError::UnknownField(s.to_string()))
    }
}
