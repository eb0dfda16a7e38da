//! Combined key material and random nonce generation

use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{CipherError, Result};
use crate::NONCE_SIZE;

/// A combined `MAC_KEY || ENC_KEY` key. Zeroized on drop.
#[derive(Clone)]
pub struct CombinedKey {
    bytes: Vec<u8>,
}

impl CombinedKey {
    /// Wrap raw key bytes. The length must be 32, 48 or 64.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if !matches!(bytes.len(), 32 | 48 | 64) {
            let len = bytes.len();
            let mut bytes = bytes;
            bytes.zeroize();
            return Err(CipherError::InvalidKey(format!(
                "combined key must be 32, 48 or 64 bytes, got {len}"
            )));
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for CombinedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for CombinedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random combined key of `len` bytes (32, 48 or 64).
pub fn generate_key(len: usize) -> Result<CombinedKey> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    CombinedKey::from_bytes(bytes)
}

/// Generate a random 128-bit IV.
///
/// IVs must never repeat under one key; 128 random bits make a collision
/// negligible for any realistic message count.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
