//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - Ed25519 key pair generation, signing, and verification
//! - SHA-256 hashing for address derivation and record tags
//! - BLAKE3 chaining for journal entries

use crate::types::{Address, Signature};
use crate::{Error, Result};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// Ed25519 key pair for signing
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Wallet address (the public key)
    pub fn address(&self) -> Address {
        Address::new(self.verifying_key.to_bytes())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signature = self.signing_key.sign(message);
        Signature::from_bytes(signature.to_bytes())
    }

    /// Verify a signature
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());
        self.verifying_key
            .verify(message, &dalek_sig)
            .map_err(|e| Error::SignatureError(format!("Verification failed: {}", e)))
    }
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash `previous || body` with BLAKE3
pub fn chain_hash(previous: &[u8; 32], body: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(previous);
    hasher.update(body);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_from_seed() {
        let seed = [42u8; 32];
        let keypair1 = KeyPair::from_seed(&seed);
        let keypair2 = KeyPair::from_seed(&seed);

        // Same seed should produce same keys
        assert_eq!(keypair1.address(), keypair2.address());
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let message = b"test message";

        let signature = keypair.sign(message);
        assert!(keypair.verify(message, &signature).is_ok());
        assert!(signature.verify(message, &keypair.address()));

        // Wrong message should fail
        assert!(keypair.verify(b"wrong message", &signature).is_err());

        // Wrong signer should fail
        let other = KeyPair::generate();
        assert!(!signature.verify(message, &other.address()));
    }

    #[test]
    fn test_hash_bytes() {
        let hash1 = hash_bytes(b"test data");
        let hash2 = hash_bytes(b"test data");
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash_bytes(b"different data"));
    }

    #[test]
    fn test_chain_hash_depends_on_previous() {
        let body = b"entry";
        assert_ne!(chain_hash(&[0u8; 32], body), chain_hash(&[1u8; 32], body));
        assert_eq!(chain_hash(&[3u8; 32], body), chain_hash(&[3u8; 32], body));
    }

    #[test]
    fn test_known_signature_vector() {
        // RFC 8032 test vector
        let seed = [
            0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60,
            0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c, 0xc4,
            0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19,
            0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae, 0x7f, 0x60,
        ];

        let keypair = KeyPair::from_seed(&seed);
        assert_eq!(
            hex::encode(keypair.address().as_bytes()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );

        let signature = keypair.sign(b"");
        assert!(keypair.verify(b"", &signature).is_ok());
    }
}
