//! Cryptographic primitives: SHA-256 hashing and secp256k1 ECDSA keys

pub mod hash;
pub mod keys;

pub use hash::{hash_meets_difficulty, hex_to_binary, sha256, sha256_hex, EncodingError};
pub use keys::{
    derive_public_address, public_key_from_address, sign_digest, verify_signature, KeyError,
    KeyPair,
};
