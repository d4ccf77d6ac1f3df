//! ECDSA key management
//!
//! Key pair generation, signing, and verification on the secp256k1 curve.
//! The hex-encoded compressed public key doubles as the account address.

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid message digest")]
    InvalidDigest,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// The account address: hex-encoded compressed public key
    pub fn address(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a 32-byte message digest with the private key
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_digest(&self.secret_key, digest)
    }
}

/// Derive the public address from a hex-encoded private key
pub fn derive_public_address(private_key_hex: &str) -> Result<String, KeyError> {
    Ok(KeyPair::from_private_key_hex(private_key_hex)?.address())
}

/// Parse an address (hex-encoded compressed public key) back into a key
pub fn public_key_from_address(address: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(address).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign a 32-byte message digest with a secret key
pub fn sign_digest(secret_key: &SecretKey, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest).map_err(|_| KeyError::InvalidDigest)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact ECDSA signature over a 32-byte digest
pub fn verify_signature(
    public_key: &PublicKey,
    digest: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest).map_err(|_| KeyError::InvalidDigest)?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature)
        .map_err(|_| KeyError::InvalidSignature)?;

    match secp.verify_ecdsa(&message, &sig, public_key) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}
