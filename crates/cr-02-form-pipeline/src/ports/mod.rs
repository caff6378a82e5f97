//! Ports layer: the pipeline API and the external collaborators it drives.

pub mod inbound;
pub mod outbound;

pub use inbound::{FormPipelineApi, Resolution};
pub use outbound::{CommitEngine, FormCache};
