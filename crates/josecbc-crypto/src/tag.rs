//! Authentication tag: truncated HMAC over the AEAD inputs
//!
//! ```text
//! T = HMAC-H(MAC_KEY, A || IV || E || be64(len(A) * 8))[0..len(MAC_KEY)]
//! ```
//!
//! The hash is fixed by the MAC key length when the context is built. The
//! key is kept in a zeroizing buffer and an HMAC is keyed per message, so no
//! unwiped keyed state outlives a call.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{CipherError, Result};

/// Hash used for the integrity check, chosen by integrity-key length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrityHash {
    Sha256,
    Sha384,
    Sha512,
}

impl IntegrityHash {
    /// Map an integrity-key length (16, 24, 32) to its hash.
    pub fn for_key_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(IntegrityHash::Sha256),
            24 => Some(IntegrityHash::Sha384),
            32 => Some(IntegrityHash::Sha512),
            _ => None,
        }
    }

    /// Integrity-key length, which is also the truncated tag length.
    pub fn key_len(self) -> usize {
        match self {
            IntegrityHash::Sha256 => 16,
            IntegrityHash::Sha384 => 24,
            IntegrityHash::Sha512 => 32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegrityHash::Sha256 => "HS256",
            IntegrityHash::Sha384 => "HS384",
            IntegrityHash::Sha512 => "HS512",
        }
    }
}

/// Computes and verifies tags for one integrity key.
///
/// Only the raw key is stored, in a zeroizing buffer. A keyed HMAC state is
/// built per message and dropped with it.
#[derive(Clone)]
pub struct TagComputer {
    hash: IntegrityHash,
    key: Zeroizing<Vec<u8>>,
}

impl TagComputer {
    /// Fails with [`CipherError::InvalidKey`] unless `integrity_key` is 16,
    /// 24 or 32 bytes long.
    pub fn new(integrity_key: &[u8]) -> Result<Self> {
        let hash = IntegrityHash::for_key_len(integrity_key.len()).ok_or_else(|| {
            CipherError::InvalidKey(format!(
                "integrity key must be 16, 24 or 32 bytes, got {}",
                integrity_key.len()
            ))
        })?;
        Ok(Self {
            hash,
            key: Zeroizing::new(integrity_key.to_vec()),
        })
    }

    pub fn hash(&self) -> IntegrityHash {
        self.hash
    }

    /// Tag length in bytes.
    pub fn tag_len(&self) -> usize {
        self.hash.key_len()
    }

    /// Compute the truncated tag over `(aad, nonce, ciphertext)`.
    pub fn compute(&self, aad: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let al = aad_bit_len(aad);
        let parts: [&[u8]; 4] = [aad, nonce, ciphertext, &al];
        let mut full = match self.hash {
            IntegrityHash::Sha256 => mac_parts::<Hmac<Sha256>>(&self.key, &parts),
            IntegrityHash::Sha384 => mac_parts::<Hmac<Sha384>>(&self.key, &parts),
            IntegrityHash::Sha512 => mac_parts::<Hmac<Sha512>>(&self.key, &parts),
        }?;
        full.truncate(self.tag_len());
        Ok(full)
    }

    /// Recompute the tag and compare it to `received` in constant time.
    pub fn verify(
        &self,
        aad: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        received: &[u8],
    ) -> Result<bool> {
        let expected = self.compute(aad, nonce, ciphertext)?;
        Ok(expected.ct_eq(received).into())
    }
}

impl std::fmt::Debug for TagComputer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagComputer")
            .field("hash", &self.hash)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn mac_parts<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>> {
    let mut mac = <M as KeyInit>::new_from_slice(key)
        .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

/// `AL`: the AAD length in bits as a 64-bit big-endian integer.
fn aad_bit_len(aad: &[u8]) -> [u8; 8] {
    ((aad.len() as u64) * 8).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_selection() {
        assert_eq!(IntegrityHash::for_key_len(16), Some(IntegrityHash::Sha256));
        assert_eq!(IntegrityHash::for_key_len(24), Some(IntegrityHash::Sha384));
        assert_eq!(IntegrityHash::for_key_len(32), Some(IntegrityHash::Sha512));
        for len in [0, 8, 20, 48, 64] {
            assert_eq!(IntegrityHash::for_key_len(len), None);
        }
    }

    #[test]
    fn test_new_rejects_unsupported_key() {
        let err = TagComputer::new(&[0u8; 20]).unwrap_err();
        assert!(matches!(err, CipherError::InvalidKey(_)));
    }

    #[test]
    fn test_tag_length_matches_key() {
        for len in [16, 24, 32] {
            let tc = TagComputer::new(&vec![1u8; len]).unwrap();
            assert_eq!(tc.compute(b"aad", &[0u8; 16], b"ct").unwrap().len(), len);
        }
    }

    #[test]
    fn test_tag_is_truncated_hmac_of_layout() {
        let key = [0x0bu8; 24];
        let aad = b"header";
        let nonce = [0x22u8; 16];
        let ct = [0x33u8; 32];

        let mut mac = <Hmac<Sha384> as Mac>::new_from_slice(&key).unwrap();
        mac.update(aad);
        mac.update(&nonce);
        mac.update(&ct);
        mac.update(&48u64.to_be_bytes());
        let full = mac.finalize().into_bytes();

        let tc = TagComputer::new(&key).unwrap();
        assert_eq!(tc.compute(aad, &nonce, &ct).unwrap(), full[..24].to_vec());
    }

    #[test]
    fn test_aad_bit_len_encoding() {
        assert_eq!(aad_bit_len(b""), [0u8; 8]);
        assert_eq!(aad_bit_len(&[0u8; 42]), [0, 0, 0, 0, 0, 0, 0x01, 0x50]);
    }

    #[test]
    fn test_verify_detects_single_bit_flip() {
        let tc = TagComputer::new(&[5u8; 32]).unwrap();
        let tag = tc.compute(b"a", b"n", b"c").unwrap();
        assert!(tc.verify(b"a", b"n", b"c", &tag).unwrap());

        for i in 0..tag.len() {
            let mut bad = tag.clone();
            bad[i] ^= 0x01;
            assert!(!tc.verify(b"a", b"n", b"c", &bad).unwrap());
        }
    }

    #[test]
    fn test_verify_rejects_wrong_length_tag() {
        let tc = TagComputer::new(&[5u8; 16]).unwrap();
        let tag = tc.compute(b"a", b"n", b"c").unwrap();
        assert!(!tc.verify(b"a", b"n", b"c", &tag[..15]).unwrap());
        assert!(!tc.verify(b"a", b"n", b"c", &[]).unwrap());
    }

    #[test]
    fn test_key_storage_is_wiped_on_drop() {
        assert!(std::mem::needs_drop::<TagComputer>());
    }

    #[test]
    fn test_clone_computes_same_tag() {
        let tc = TagComputer::new(&[3u8; 24]).unwrap();
        let copy = tc.clone();
        drop(tc);
        let fresh = TagComputer::new(&[3u8; 24]).unwrap();
        assert_eq!(
            copy.compute(b"a", b"n", b"c").unwrap(),
            fresh.compute(b"a", b"n", b"c").unwrap()
        );
    }

    #[test]
    fn test_aad_boundary_is_bound() {
        // Moving a byte between AAD and ciphertext changes AL, so tags differ.
        let tc = TagComputer::new(&[9u8; 16]).unwrap();
        let t1 = tc.compute(b"ab", b"", b"c").unwrap();
        let t2 = tc.compute(b"a", b"", b"bc").unwrap();
        assert_ne!(t1, t2);
    }
}
