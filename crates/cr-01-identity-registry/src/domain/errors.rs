//! # Registry Errors
//!
//! Error types for identity registry and authentication operations.

use shared_types::{PublicKeyId, ResultCode};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while accessing the identity registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An identity with this public key is already registered.
    #[error("Identity with public key {0} already exists")]
    DuplicateIdentity(PublicKeyId),

    /// No identity with this public key is registered.
    #[error("Identity with public key {0} not found")]
    IdentityNotFound(PublicKeyId),

    /// The supplied secret does not match the stored one.
    #[error("Invalid public key + passphrase for {0}")]
    InvalidCredentials(PublicKeyId),

    /// The registry could not be acquired before the deadline.
    #[error("Identity registry unavailable after waiting {waited:?}")]
    RegistryUnavailable { waited: Duration },
}

impl RegistryError {
    /// Caller-facing result code.
    #[must_use]
    pub fn code(&self) -> ResultCode {
        match self {
            Self::DuplicateIdentity(_) => ResultCode::DuplicateIdentity,
            Self::IdentityNotFound(_) => ResultCode::IdentityNotFound,
            Self::InvalidCredentials(_) => ResultCode::InvalidCredentials,
            Self::RegistryUnavailable { .. } => ResultCode::RegistryUnavailable,
        }
    }
}
