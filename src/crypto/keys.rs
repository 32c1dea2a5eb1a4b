//! ECDSA key management on the secp256k1 curve.
//!
//! Addresses are the hex encoding of the compressed public key; transaction
//! inputs are signed over the transaction id digest.

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
    #[error("Invalid signature encoding")]
    InvalidSignature,
    #[error("Invalid message digest")]
    InvalidDigest,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A secp256k1 key pair
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

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format).
    /// This doubles as the wallet address.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a hex-encoded 32-byte digest; returns the signature as hex
    pub fn sign_digest_hex(&self, digest_hex: &str) -> Result<String, KeyError> {
        let digest = hex::decode(digest_hex).map_err(|_| KeyError::InvalidDigest)?;
        let message = Message::from_digest_slice(&digest).map_err(|_| KeyError::InvalidDigest)?;
        let secp = Secp256k1::new();
        let signature = secp.sign_ecdsa(&message, &self.secret_key);
        Ok(hex::encode(signature.serialize_compact()))
    }
}

/// Parse a compressed public key from its hex form
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Verify a hex signature over a hex digest against a hex public key
pub fn verify_signature_hex(
    public_key_hex: &str,
    digest_hex: &str,
    signature_hex: &str,
) -> Result<bool, KeyError> {
    let public_key = public_key_from_hex(public_key_hex)?;
    let digest = hex::decode(digest_hex).map_err(|_| KeyError::InvalidDigest)?;
    let message = Message::from_digest_slice(&digest).map_err(|_| KeyError::InvalidDigest)?;
    let sig_bytes = hex::decode(signature_hex).map_err(|_| KeyError::InvalidSignature)?;
    let signature = secp256k1::ecdsa::Signature::from_compact(&sig_bytes)
        .map_err(|_| KeyError::InvalidSignature)?;

    let secp = Secp256k1::new();
    Ok(secp.verify_ecdsa(&message, &signature, &public_key).is_ok())
}
