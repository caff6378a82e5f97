//! # Outbound Ports (Driven Ports)
//!
//! The commit engine and the form cache are external to the pipeline; only
//! their contracts are defined here.

use async_trait::async_trait;
use shared_types::{CommitResult, Form, FormId, SearchCriteria, StatusFilter};

/// Consensus-ordered transaction log.
///
/// Provides its own internal serialization. The pipeline never holds the
/// identity registry while awaiting `append`.
#[async_trait]
pub trait CommitEngine: Send + Sync {
    /// Durably append a secret-free transaction body.
    ///
    /// A result with `code == Ok` means the transaction is committed; its
    /// `data` carries the assigned form id.
    async fn append(&self, body: &[u8]) -> CommitResult;
}

/// Query contract of the committed-form store.
pub trait FormCache: Send + Sync {
    fn find_by_id(&self, id: &FormId) -> Option<Form>;

    /// Forms matching `criteria` whose status passes `status`.
    /// An empty result is not an error.
    fn search(&self, criteria: &SearchCriteria, status: StatusFilter) -> Vec<Form>;

    /// Transition a form to resolved. Returns `false` when the form is
    /// unknown or already resolved.
    fn mark_resolved(&self, id: &FormId) -> bool;

    /// Index a newly committed form.
    fn insert(&self, form: Form);
}
