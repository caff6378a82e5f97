//! Identity entities.

use crate::ports::outbound::PeerHandle;
use shared_types::{Privilege, PublicKeyId};
use std::fmt;
use std::sync::{Arc, Weak};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Secret an identity re-authenticates with (the registration passphrase).
#[derive(Clone)]
pub struct AuthSecret(Zeroizing<String>);

impl AuthSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Plain equality against a candidate, evaluated in constant time.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl fmt::Debug for AuthSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthSecret(<redacted>)")
    }
}

/// A registered, public-key-addressable actor.
///
/// Never mutated in place: removal and re-creation are the only lifecycle
/// transitions. The peer handle is a non-owning back-reference into the
/// networking layer.
#[derive(Clone)]
pub struct Identity {
    public_key_id: PublicKeyId,
    privilege: Privilege,
    secret: AuthSecret,
    peer: Weak<dyn PeerHandle>,
}

impl Identity {
    pub fn new(
        public_key_id: PublicKeyId,
        privilege: Privilege,
        secret: AuthSecret,
        peer: &Arc<dyn PeerHandle>,
    ) -> Self {
        Self {
            public_key_id,
            privilege,
            secret,
            peer: Arc::downgrade(peer),
        }
    }

    #[must_use]
    pub fn public_key_id(&self) -> &PublicKeyId {
        &self.public_key_id
    }

    #[must_use]
    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.privilege.is_admin()
    }

    #[must_use]
    pub fn secret_matches(&self, candidate: &str) -> bool {
        self.secret.matches(candidate)
    }

    /// The live peer, if the networking layer still runs it.
    #[must_use]
    pub fn peer(&self) -> Option<Arc<dyn PeerHandle>> {
        self.peer.upgrade()
    }

    /// True only while the peer exists and reports itself running.
    #[must_use]
    pub fn peer_active(&self) -> bool {
        self.peer().is_some_and(|p| p.is_active())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("public_key_id", &self.public_key_id)
            .field("privilege", &self.privilege)
            .field("secret", &self.secret)
            .field("peer_active", &self.peer_active())
            .finish()
    }
}
