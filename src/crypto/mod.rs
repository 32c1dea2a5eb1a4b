//! Cryptographic primitives: SHA-256 hashing and secp256k1 signatures.

pub mod hash;
pub mod keys;

pub use hash::{meets_difficulty, sha256, sha256_hex};
pub use keys::{public_key_from_hex, verify_signature_hex, KeyError, KeyPair};
