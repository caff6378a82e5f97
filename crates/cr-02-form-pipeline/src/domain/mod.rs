//! Domain layer for the form pipeline.

pub mod errors;
pub mod role;

pub use errors::PipelineError;
pub use role::{AccountRole, AdminRole, Operation, Role};
