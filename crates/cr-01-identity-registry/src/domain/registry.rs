//! # Identity Registry
//!
//! Concurrency-safe map from public key identifier to [`Identity`].
//!
//! ## Exclusivity Protocol
//!
//! Every operation, including pure reads, acquires the single map lock,
//! performs its work synchronously with no I/O in between, and releases the
//! lock when the scoped guard drops. Release therefore happens on every exit
//! path, early returns and errors included. `tokio::sync::Mutex` queues
//! waiters fairly, so operations take effect in acquisition order.
//!
//! The `*_with` variants run a synchronous hook under the same guard. Peer
//! start and stop go through these hooks so that peer lifecycle changes are
//! ordered with the registry change they belong to.
//!
//! Callers must not hold anything obtained here across commit or broadcast:
//! the public API only ever hands out clones.

use crate::domain::entities::Identity;
use crate::domain::errors::RegistryError;
use shared_types::PublicKeyId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

type IdentityMap = HashMap<PublicKeyId, Identity>;

/// Shared identity registry.
///
/// Constructed empty at startup and passed explicitly (usually as an `Arc`)
/// to every component that needs it; dropped with the node.
pub struct IdentityRegistry {
    identities: Mutex<IdentityMap>,
    acquire_timeout: Option<Duration>,
}

impl IdentityRegistry {
    /// Create an empty registry whose callers wait indefinitely.
    #[must_use]
    pub fn new() -> Self {
        Self::with_acquire_timeout(None)
    }

    /// Create an empty registry that gives up acquisition after `timeout`.
    #[must_use]
    pub fn with_acquire_timeout(timeout: Option<Duration>) -> Self {
        Self {
            identities: Mutex::new(HashMap::new()),
            acquire_timeout: timeout,
        }
    }

    /// Acquire exclusive access to the map.
    async fn acquire(&self) -> Result<MutexGuard<'_, IdentityMap>, RegistryError> {
        match self.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, self.identities.lock())
                .await
                .map_err(|_| RegistryError::RegistryUnavailable { waited: limit }),
            None => Ok(self.identities.lock().await),
        }
    }

    /// Register a new identity.
    ///
    /// # Errors
    /// - `DuplicateIdentity`: the public key is already registered
    pub async fn add(&self, identity: Identity) -> Result<(), RegistryError> {
        let id = identity.public_key_id().clone();
        self.add_with(&id, || identity).await
    }

    /// Register the identity produced by `build`, which runs under the
    /// registry guard and only once `id` is known to be free.
    ///
    /// # Errors
    /// - `DuplicateIdentity`: `id` is already registered; `build` is not called
    /// - `RegistryUnavailable`: acquisition timed out; `build` is not called
    pub async fn add_with<B>(&self, id: &PublicKeyId, build: B) -> Result<(), RegistryError>
    where
        B: FnOnce() -> Identity,
    {
        let mut identities = self.acquire().await?;
        if identities.contains_key(id) {
            return Err(RegistryError::DuplicateIdentity(id.clone()));
        }
        let identity = build();
        debug!(public_key = %id.short(), privilege = %identity.privilege(), "Identity added");
        identities.insert(id.clone(), identity);
        Ok(())
    }

    /// Remove an identity after checking its secret.
    ///
    /// # Errors
    /// - `IdentityNotFound`: no identity with this public key
    /// - `InvalidCredentials`: the secret does not match; nothing is removed
    pub async fn remove(&self, id: &PublicKeyId, secret: &str) -> Result<Identity, RegistryError> {
        self.remove_with(id, secret, |_| ()).await
    }

    /// [`remove`](Self::remove), running `on_removed` before the guard is
    /// released.
    ///
    /// # Errors
    /// As [`remove`](Self::remove); `on_removed` runs only on success.
    pub async fn remove_with<A>(
        &self,
        id: &PublicKeyId,
        secret: &str,
        on_removed: A,
    ) -> Result<Identity, RegistryError>
    where
        A: FnOnce(&Identity),
    {
        let mut identities = self.acquire().await?;
        match identities.get(id) {
            None => Err(RegistryError::IdentityNotFound(id.clone())),
            Some(identity) if !identity.secret_matches(secret) => {
                Err(RegistryError::InvalidCredentials(id.clone()))
            }
            Some(_) => {
                let removed = identities
                    .remove(id)
                    .ok_or_else(|| RegistryError::IdentityNotFound(id.clone()))?;
                on_removed(&removed);
                debug!(public_key = %id.short(), "Identity removed");
                Ok(removed)
            }
        }
    }

    /// Remove an identity without its secret. Callers must have authorised
    /// the revocation beforehand.
    ///
    /// # Errors
    /// - `IdentityNotFound`: no identity with this public key
    pub async fn revoke(&self, id: &PublicKeyId) -> Result<Identity, RegistryError> {
        self.revoke_with(id, |_| ()).await
    }

    /// [`revoke`](Self::revoke), running `on_revoked` before the guard is
    /// released.
    ///
    /// # Errors
    /// As [`revoke`](Self::revoke); `on_revoked` runs only on success.
    pub async fn revoke_with<A>(
        &self,
        id: &PublicKeyId,
        on_revoked: A,
    ) -> Result<Identity, RegistryError>
    where
        A: FnOnce(&Identity),
    {
        let mut identities = self.acquire().await?;
        let removed = identities
            .remove(id)
            .ok_or_else(|| RegistryError::IdentityNotFound(id.clone()))?;
        on_revoked(&removed);
        debug!(public_key = %id.short(), "Identity revoked");
        Ok(removed)
    }

    /// Look up an identity. `Ok(None)` means not registered.
    pub async fn lookup(&self, id: &PublicKeyId) -> Result<Option<Identity>, RegistryError> {
        let identities = self.acquire().await?;
        Ok(identities.get(id).cloned())
    }

    pub async fn contains(&self, id: &PublicKeyId) -> Result<bool, RegistryError> {
        Ok(self.acquire().await?.contains_key(id))
    }

    /// Number of registered identities.
    pub async fn len(&self) -> Result<usize, RegistryError> {
        Ok(self.acquire().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.len().await? == 0)
    }

    /// Registered public keys, sorted.
    pub async fn public_keys(&self) -> Result<Vec<PublicKeyId>, RegistryError> {
        let identities = self.acquire().await?;
        let mut keys: Vec<PublicKeyId> = identities.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
