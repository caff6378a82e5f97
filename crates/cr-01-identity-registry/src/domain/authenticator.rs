//! # Authenticator
//!
//! Verifies a (public key, secret) pair against the registry. Every
//! state-changing command passes through here before any external effect.

use crate::domain::entities::Identity;
use crate::domain::errors::RegistryError;
use crate::domain::registry::IdentityRegistry;
use shared_types::PublicKeyId;
use std::sync::Arc;
use tracing::debug;

/// Registry-backed credential check.
#[derive(Clone)]
pub struct Authenticator {
    registry: Arc<IdentityRegistry>,
}

impl Authenticator {
    pub fn new(registry: Arc<IdentityRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this authenticator reads from.
    #[must_use]
    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    /// Authenticate `id` with `secret`.
    ///
    /// Returns a snapshot of the identity; the registry guard is released
    /// before this returns, so callers may await freely afterwards.
    ///
    /// # Errors
    /// - `IdentityNotFound`: no identity with this public key
    /// - `InvalidCredentials`: the secret differs from the stored one
    /// - `RegistryUnavailable`: the registry could not be acquired in time
    pub async fn authenticate(
        &self,
        id: &PublicKeyId,
        secret: &str,
    ) -> Result<Identity, RegistryError> {
        match self.registry.lookup(id).await? {
            Some(identity) if identity.secret_matches(secret) => Ok(identity),
            Some(_) => {
                debug!(public_key = %id.short(), "Secret mismatch");
                Err(RegistryError::InvalidCredentials(id.clone()))
            }
            None => {
                debug!(public_key = %id.short(), "Unknown public key");
                Err(RegistryError::IdentityNotFound(id.clone()))
            }
        }
    }
}
