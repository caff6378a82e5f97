//! # Inbound Ports (Driving Ports / API)
//!
//! The command surface of a role-parameterised pipeline. Every method
//! returns either its success value or a single `PipelineError`; nothing
//! panics across this boundary.

use crate::domain::errors::PipelineError;
use async_trait::async_trait;
use cr_01_identity_registry::DerivedKeys;
use shared_types::{
    CommitResult, Form, LookupFields, PublicKeyId, SearchFields, StatusFilter, SubmitFields,
};

/// Outcome of `resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The form moved from open to resolved.
    Resolved,
    /// The form was already resolved; nothing changed.
    AlreadyResolved,
}

/// Form pipeline API.
#[async_trait]
pub trait FormPipelineApi: Send + Sync {
    /// Name of the role this pipeline enforces.
    fn role_name(&self) -> &'static str;

    /// Register an account identity derived from `passphrase`.
    async fn create_account(&self, passphrase: &str) -> Result<DerivedKeys, PipelineError>;

    /// Register an admin identity. The acting identity must be an admin.
    async fn create_admin(
        &self,
        passphrase: &str,
        acting: &PublicKeyId,
        secret: &str,
    ) -> Result<DerivedKeys, PipelineError>;

    /// Remove the caller's own identity.
    async fn remove_account(&self, id: &PublicKeyId, secret: &str) -> Result<(), PipelineError>;

    /// Remove the caller's own admin identity.
    async fn remove_admin(&self, id: &PublicKeyId, secret: &str) -> Result<(), PipelineError>;

    /// Remove another identity without its secret. The acting identity must
    /// be an admin.
    async fn revoke_identity(
        &self,
        target: &PublicKeyId,
        acting: &PublicKeyId,
        secret: &str,
    ) -> Result<(), PipelineError>;

    /// Authenticate, commit and broadcast a form.
    ///
    /// A commit the engine refused comes back as `Ok` with a non-ok code,
    /// unchanged.
    async fn submit(&self, fields: SubmitFields) -> Result<CommitResult, PipelineError>;

    /// Fetch one form by id.
    async fn find(&self, fields: LookupFields) -> Result<Form, PipelineError>;

    /// Search forms. No matches is `Ok(vec![])`.
    async fn search(
        &self,
        fields: SearchFields,
        status: StatusFilter,
    ) -> Result<Vec<Form>, PipelineError>;

    /// Mark a form resolved. Already-resolved forms are a no-op success.
    async fn resolve(&self, fields: LookupFields) -> Result<Resolution, PipelineError>;
}
