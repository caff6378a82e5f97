//! Ed25519 keypair derivation.
//!
//! The passphrase is hashed with SHA-256 and the digest is used as the
//! Ed25519 seed, so the same passphrase always yields the same keypair.

use crate::ports::outbound::{DerivedKeys, KeyDerivationError, KeyDeriver};
use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};
use shared_types::PublicKeyId;
use zeroize::{Zeroize, Zeroizing};

/// Deterministic passphrase-to-keypair derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519KeyDeriver;

impl Ed25519KeyDeriver {
    pub fn new() -> Self {
        Self
    }
}

impl KeyDeriver for Ed25519KeyDeriver {
    fn derive(&self, passphrase: &str) -> Result<DerivedKeys, KeyDerivationError> {
        if passphrase.is_empty() {
            return Err(KeyDerivationError::EmptyPassphrase);
        }

        let mut seed: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();

        let public_key_id = PublicKeyId::from_key_bytes(&signing_key.verifying_key().to_bytes());
        let mut keypair = signing_key.to_keypair_bytes();
        let private_key_hex = Zeroizing::new(hex::encode(keypair));
        keypair.zeroize();

        Ok(DerivedKeys {
            public_key_id,
            private_key_hex,
        })
    }
}
