//! Review workflow for org-unit change proposals.
//!
//! Every approval or rejection first passes a fail-fast pipeline of checks
//! (status, fields, permission). Only then does the workflow write: the
//! approved values onto the org unit, the proposal's terminal status and an
//! audit entry capturing the org unit before and after.
//!
//! ```text
//! NEW ──approve──▶ APPROVED   (org unit VALID)
//!  └───reject───▶ REJECTED   (org unit REJECTED)
//! ```

pub mod audit;
pub mod check;
pub mod checks;
pub mod config;
pub mod error;
pub mod permission;
pub mod pipeline;
pub mod workflow;

pub use audit::{AuditEntry, AuditSink, InMemoryAuditLog};
pub use check::{CheckContext, CheckDecision, CheckResult, ReviewAction, ReviewCheck, ReviewRequest};
pub use config::ReviewConfig;
pub use error::{ReviewError, ReviewResult};
pub use permission::{AllowAll, AllowList, ReviewPermission};
pub use pipeline::ReviewPipeline;
pub use workflow::ReviewWorkflow;
