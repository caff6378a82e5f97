//! Outbound (Driven) ports for the Identity Registry.
//!
//! These traits define the networking layer and key derivation the registry
//! and its callers rely on. Neither is owned by the registry.

use async_trait::async_trait;
use shared_bus::ChannelId;
use shared_types::PublicKeyId;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors from a peer broadcast.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BroadcastError {
    /// The peer was stopped or dropped by the networking layer.
    #[error("Peer {0} is not running")]
    PeerStopped(PublicKeyId),

    /// The transport refused the message.
    #[error("Broadcast transport error: {0}")]
    Transport(String),
}

/// Live network peer representing one identity.
#[async_trait]
pub trait PeerHandle: Send + Sync {
    /// Identity this peer runs for.
    fn public_key_id(&self) -> &PublicKeyId;

    /// Whether the peer is currently running.
    fn is_active(&self) -> bool;

    /// Broadcast `payload` on `channel`.
    ///
    /// # Returns
    ///
    /// The number of receivers the message reached.
    async fn broadcast(&self, channel: ChannelId, payload: &str) -> Result<usize, BroadcastError>;
}

/// Networking layer that owns peers.
///
/// The registry only records `Weak` handles; whatever implements this trait
/// decides how long a peer lives.
pub trait PeerNetwork: Send + Sync {
    /// Start a peer for `id` and connect it to the node, or return the one
    /// already running.
    fn start_peer(&self, id: &PublicKeyId) -> Arc<dyn PeerHandle>;

    /// Stop and release the peer for `id`. Returns `false` if none was running.
    fn stop_peer(&self, id: &PublicKeyId) -> bool;
}

/// Errors from key derivation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyDerivationError {
    #[error("Passphrase must not be empty")]
    EmptyPassphrase,
}

/// Keypair material derived from a passphrase.
pub struct DerivedKeys {
    /// Public identifier of the keypair.
    pub public_key_id: PublicKeyId,
    /// Hex-encoded private keypair, returned once to the caller.
    pub private_key_hex: Zeroizing<String>,
}

impl fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("public_key_id", &self.public_key_id)
            .field("private_key_hex", &"<redacted>")
            .finish()
    }
}

/// Deterministic keypair derivation from a passphrase.
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, passphrase: &str) -> Result<DerivedKeys, KeyDerivationError>;
}
