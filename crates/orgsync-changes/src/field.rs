use std::fmt;
use std::str::FromStr;

use orgsync_diff::DiffField;
use serde::{Deserialize, Serialize};

use crate::error::ProposalError;

/// An editable org unit field, named after the proposal's `new_<field>`
/// column it drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProposalField {
    #[serde(rename = "new_name")]
    Name,
    #[serde(rename = "new_parent")]
    Parent,
    #[serde(rename = "new_org_unit_type")]
    OrgUnitType,
    #[serde(rename = "new_groups")]
    Groups,
    #[serde(rename = "new_location")]
    Location,
    #[serde(rename = "new_opening_date")]
    OpeningDate,
    #[serde(rename = "new_closed_date")]
    ClosedDate,
    #[serde(rename = "new_reference_instances")]
    ReferenceInstances,
    #[serde(rename = "new_geometry")]
    Geometry,
}

impl ProposalField {
    /// The statically known editable field set.
    pub const ALL: [ProposalField; 9] = [
        ProposalField::Name,
        ProposalField::Parent,
        ProposalField::OrgUnitType,
        ProposalField::Groups,
        ProposalField::Location,
        ProposalField::OpeningDate,
        ProposalField::ClosedDate,
        ProposalField::ReferenceInstances,
        ProposalField::Geometry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "new_name",
            Self::Parent => "new_parent",
            Self::OrgUnitType => "new_org_unit_type",
            Self::Groups => "new_groups",
            Self::Location => "new_location",
            Self::OpeningDate => "new_opening_date",
            Self::ClosedDate => "new_closed_date",
            Self::ReferenceInstances => "new_reference_instances",
            Self::Geometry => "new_geometry",
        }
    }
}

impl fmt::Display for ProposalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalField {
    type Err = ProposalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| ProposalError::UnknownField(s.to_string()))
    }
}

impl From<DiffField> for ProposalField {
    fn from(field: DiffField) -> Self {
        match field {
            DiffField::Name => Self::Name,
            DiffField::Parent => Self::Parent,
            DiffField::OrgUnitType => Self::OrgUnitType,
            DiffField::OpeningDate => Self::OpeningDate,
            DiffField::ClosedDate => Self::ClosedDate,
            DiffField::Location => Self::Location,
            DiffField::Groups => Self::Groups,
            DiffField::Geometry => Self::Geometry,
        }
    }
}
