//! Version synchronization for org-unit hierarchies.
//!
//! A [`Synchronization`] pairs a version to update with a version to compare
//! with. Its lifecycle is create, refresh the diff (repeatable), then apply
//! once: missing org units are materialized root-to-leaf and every diff
//! entry becomes a [`ChangeProposal`](orgsync_changes::ChangeProposal) for
//! review.

pub mod error;
pub mod generator;
pub mod service;
pub mod synchronization;

pub use error::{ConfigError, SyncError, SyncResult};
pub use generator::{ChangeProposalGenerator, GenerationOutcome};
pub use service::{SyncReport, SynchronizationService};
pub use synchronization::{InMemorySynchronizationStore, Synchronization, SynchronizationStore};
