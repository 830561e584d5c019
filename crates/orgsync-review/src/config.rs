use serde::{Deserialize, Serialize};

/// Rules applied by the review check pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Rejections must carry a non-blank comment.
    pub require_rejection_comment: bool,
    /// Approved fields must be a subset of the requested fields.
    pub restrict_to_requested_fields: bool,
    /// Whether an approval may approve no field at all.
    pub allow_empty_approval: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            require_rejection_comment: true,
            restrict_to_requested_fields: true,
            allow_empty_approval: false,
        }
    }
}

impl ReviewConfig {
    /// Only the state machine is enforced.
    pub fn permissive() -> Self {
        Self {
            require_rejection_comment: false,
            restrict_to_requested_fields: false,
            allow_empty_approval: true,
        }
    }
}
