//! # Domain Layer - Identity Registry
//!
//! Pure registry logic: no networking, no key generation.
//!
//! - `entities`: `Identity`, `AuthSecret`
//! - `registry`: `IdentityRegistry` with exclusive, serialized access
//! - `authenticator`: `(public key, secret)` validation
//! - `errors`: `RegistryError`

pub mod authenticator;
pub mod entities;
pub mod errors;
pub mod registry;
