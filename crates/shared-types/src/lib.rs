//! # Shared Types Crate
//!
//! This crate contains the domain entities exchanged between the identity
//! registry, the form pipeline and the node runtime, together with the
//! transaction wire codec.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Positional Wire Contract**: Writers and readers in [`codec`] agree on a
//!   fixed field order per operation kind. Changing that order breaks every
//!   peer that decodes committed transactions.
//! - **No Secrets Past the Pipeline**: A transaction body handed to the commit
//!   engine never carries the `privkey` segment.

pub mod codec;
pub mod commit;
pub mod entities;
pub mod errors;

pub use codec::{LookupFields, SearchFields, SubmitFields, TransactionBody};
pub use commit::{CommitResult, ResultCode};
pub use entities::*;
pub use errors::*;
