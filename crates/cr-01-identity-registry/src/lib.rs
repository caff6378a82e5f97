//! # Identity Registry Subsystem (CR-01)
//!
//! Maps public key identifiers to live network peers and authentication
//! secrets, and authenticates every state-changing command against it.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Identity, registry, authenticator, errors
//! - **Ports Layer** (`ports/`): Peer handle, peer network and key derivation traits
//! - **Adapters Layer** (`adapters/`): Ed25519 key derivation, bus-backed peers
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Public key ids are unique | `domain/registry.rs` - `add()` check |
//! | Every operation is serialized | `domain/registry.rs` - single `Mutex` over the map |
//! | Guard released on every exit path | `domain/registry.rs` - scoped `MutexGuard` |
//! | Add/remove apply fully or not at all | `domain/registry.rs` - check before mutate |
//! | Registry never owns peers | `domain/entities.rs` - `Weak<dyn PeerHandle>` |
//!
//! ## Concurrency Model
//!
//! ```text
//! caller A ──lock()──→ [ map ] ──guard dropped──→ caller B ──lock()──→ ...
//! ```
//!
//! The map sits behind one `tokio::sync::Mutex`. Reads and writes take the
//! same lock, waiters are served in FIFO order, and no I/O happens while the
//! guard is held. An optional acquisition deadline turns an indefinite wait
//! into `RegistryUnavailable`.
//!
//! ## Security Notes
//!
//! - Secrets are compared in constant time but otherwise by plain equality
//! - Secrets are zeroized on drop and never appear in `Debug` output

pub mod adapters;
pub mod domain;
pub mod ports;

// Re-export public API
pub use adapters::keys::Ed25519KeyDeriver;
pub use adapters::peer::{BusPeer, BusPeerNetwork};
pub use domain::authenticator::Authenticator;
pub use domain::entities::{AuthSecret, Identity};
pub use domain::errors::RegistryError;
pub use domain::registry::IdentityRegistry;
pub use ports::outbound::{
    BroadcastError, DerivedKeys, KeyDerivationError, KeyDeriver, PeerHandle, PeerNetwork,
};
