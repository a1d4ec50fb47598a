//! Hashing, ed25519 keys and signatures, and transaction ids.
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::constants::HASH_SIZE;
use crate::error::{LedgerError, Result};

/// Hex encoded SHA-256 over the JSON serialization of `value`.
///
/// serde_json emits struct fields in declaration order and `Value` maps in key
/// order, so every node derives the same digest for the same value.
pub fn hash<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, value)?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256(bytes: &[u8]) -> [u8; HASH_SIZE] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn generate_keypair() -> SigningKey {
    let mut csprng = OsRng;
    SigningKey::generate(&mut csprng)
}

/// The address of a key: its hex encoded verifying key.
pub fn address_of(key: &SigningKey) -> String {
    hex::encode(key.verifying_key().to_bytes())
}

pub fn sign(key: &SigningKey, digest: &str) -> String {
    hex::encode(key.sign(digest.as_bytes()).to_bytes())
}

pub fn verify(address: &str, signature: &str, digest: &str) -> bool {
    let (Ok(key), Ok(signature)) = (parse_address(address), parse_signature(signature)) else {
        return false;
    };
    key.verify(digest.as_bytes(), &signature).is_ok()
}

pub fn parse_address(address: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(address).map_err(|e| LedgerError::InvalidKey(e.to_string()))?;
    let bytes = <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| LedgerError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| LedgerError::InvalidKey(e.to_string()))
}

fn parse_signature(signature: &str) -> Result<Signature> {
    let bytes = hex::decode(signature).map_err(|e| LedgerError::InvalidKey(e.to_string()))?;
    let bytes = <[u8; 64]>::try_from(bytes.as_slice())
        .map_err(|_| LedgerError::InvalidKey("signature must be 64 bytes".into()))?;
    Ok(Signature::from_bytes(&bytes))
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
