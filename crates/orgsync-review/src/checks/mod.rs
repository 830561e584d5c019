//! Built-in review checks.

pub mod fields;
pub mod permission;
pub mod status;

pub use fields::FieldCheck;
pub use permission::PermissionCheck;
pub use status::StatusCheck;
