//! Change proposal records for org units.
//!
//! A [`ChangeProposal`] captures one reviewable creation or modification of
//! an org unit: a frozen `old` snapshot, the proposed `new` values, the
//! fields a reviewer is asked to approve, and the review outcome. Field
//! sets are closed enums ([`ProposalField`]), validated at the boundary.
//!
//! - `ProposalWriter` / `ProposalReader` trait boundaries
//! - `InMemoryProposalStore` implementation for tests and embedding

pub mod error;
pub mod field;
pub mod memory;
pub mod proposal;
pub mod traits;
pub mod values;

pub use error::{ProposalError, ProposalResult};
pub use field::ProposalField;
pub use memory::InMemoryProposalStore;
pub use proposal::{ChangeProposal, ProposalKind, ProposalStatus};
pub use traits::{ProposalQuery, ProposalReader, ProposalStore, ProposalWriter};
pub use values::FieldValues;
