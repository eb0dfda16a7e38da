//! CBC + HMAC AEAD orchestration
//!
//! `seal`: copy → pad → CBC-encrypt → tag → `E || T`
//!
//! `open`: split → recompute tag → constant-time compare → CBC-decrypt → unpad
//!
//! The tag is always checked before any decryption. Nonces must never repeat
//! under the same key: a repeated IV leaks equality of plaintext prefixes, and
//! the context keeps no state to detect it.
//!
//! # Residual risk
//!
//! [`CipherError::AuthenticationFailed`] and [`CipherError::InvalidPadding`]
//! are returned as different variants. With an honest key holder a padding
//! failure needs a valid tag, so it cannot be triggered by an attacker who
//! lacks the MAC key, but anything that relays the distinction (error text,
//! timing of the extra decrypt step) to a remote party should be avoided.
//! Use [`CipherError::is_decryption_failure`] to handle both uniformly.

use tracing::debug;
use zeroize::Zeroizing;

use crate::block::{self, Aes, BlockCipher};
use crate::buffer;
use crate::error::{CipherError, Result};
use crate::padding::{Padding, Pkcs7, MAX_BLOCK_SIZE};
use crate::tag::{IntegrityHash, TagComputer};

/// AEAD context for one combined key.
///
/// Immutable after construction and safe to share across threads when `C`
/// is `Sync`.
pub struct CbcHmac<C, P = Pkcs7> {
    cipher: C,
    padding: P,
    tag: TagComputer,
}

/// The JWE `A*CBC-HS*` family.
pub type AesCbcHmac = CbcHmac<Aes>;

impl CbcHmac<Aes> {
    /// Build the AES variant matching the combined key length
    /// (32 → A128CBC-HS256, 48 → A192CBC-HS384, 64 → A256CBC-HS512).
    pub fn aes(key: &[u8]) -> Result<Self> {
        Self::new(key, |enc: &[u8]| {
            Aes::new(enc).map_err(|e| match e {
                CipherError::InvalidKey(msg) => msg,
                other => other.to_string(),
            })
        })
    }
}

impl<C: BlockCipher> CbcHmac<C> {
    /// Split `key` into `MAC_KEY || ENC_KEY` and build the cipher from the
    /// second half with `new_cipher`.
    ///
    /// Fails with [`CipherError::InvalidKey`] when the key length is odd,
    /// the half length is not 16, 24 or 32, or `new_cipher` rejects the
    /// encryption key.
    pub fn new<F, E>(key: &[u8], new_cipher: F) -> Result<Self>
    where
        F: FnOnce(&[u8]) -> std::result::Result<C, E>,
        E: std::fmt::Display,
    {
        Self::with_padding(key, new_cipher, Pkcs7)
    }
}

impl<C: BlockCipher, P: Padding> CbcHmac<C, P> {
    /// Like [`CbcHmac::new`] with an explicit padding implementation.
    pub fn with_padding<F, E>(key: &[u8], new_cipher: F, padding: P) -> Result<Self>
    where
        F: FnOnce(&[u8]) -> std::result::Result<C, E>,
        E: std::fmt::Display,
    {
        if key.len() % 2 != 0 {
            return Err(CipherError::InvalidKey(format!(
                "combined key length must be even, got {}",
                key.len()
            )));
        }
        let (integrity_key, encryption_key) = key.split_at(key.len() / 2);

        let tag = TagComputer::new(integrity_key)?;
        let cipher =
            new_cipher(encryption_key).map_err(|e| CipherError::InvalidKey(e.to_string()))?;

        let block_size = cipher.block_size();
        if !(1..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(CipherError::InvalidKey(format!(
                "unsupported cipher block size: {block_size}"
            )));
        }

        debug!(
            hash = tag.hash().name(),
            block_size,
            tag_len = tag.tag_len(),
            "CBC-HMAC context ready"
        );
        Ok(Self {
            cipher,
            padding,
            tag,
        })
    }

    /// Required nonce (IV) length: the cipher block size.
    pub fn nonce_size(&self) -> usize {
        self.cipher.block_size()
    }

    /// Most bytes `seal` adds to a plaintext: one block of padding plus the tag.
    pub fn overhead(&self) -> usize {
        self.cipher.block_size() + self.tag.tag_len()
    }

    /// Authentication tag length (half the combined key).
    pub fn tag_size(&self) -> usize {
        self.tag.tag_len()
    }

    pub fn integrity_hash(&self) -> IntegrityHash {
        self.tag.hash()
    }

    /// Encrypt and authenticate `plaintext`, appending `E || T` to `dst`.
    ///
    /// Existing `dst` contents are kept as a prefix and its spare capacity
    /// is reused. Output is deterministic in (key, nonce, plaintext, aad).
    pub fn seal(
        &self,
        dst: Vec<u8>,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let (ciphertext, tag) = self.seal_detached(nonce, plaintext, aad)?;
        Ok(buffer::append(dst, &[ciphertext.as_slice(), tag.as_slice()]))
    }

    /// Encrypt and authenticate, returning `(E, T)` separately as JWE
    /// carries them.
    pub fn seal_detached(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        self.check_nonce(nonce)?;
        let bs = self.cipher.block_size();

        let mut ciphertext = Vec::with_capacity(plaintext.len() + bs);
        ciphertext.extend_from_slice(plaintext);
        self.padding.pad(&mut ciphertext, bs);
        assert_eq!(
            ciphertext.len() % bs,
            0,
            "padding produced a buffer that is not block aligned"
        );

        block::cbc_encrypt(&self.cipher, nonce, &mut ciphertext);
        let tag = self.tag.compute(aad, nonce, &ciphertext)?;
        Ok((ciphertext, tag))
    }

    /// Verify and decrypt `E || T`, appending the plaintext to `dst`.
    pub fn open(
        &self,
        dst: Vec<u8>,
        nonce: &[u8],
        sealed: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.check_nonce(nonce)?;
        let tag_len = self.tag.tag_len();
        if sealed.len() < tag_len {
            return Err(CipherError::CiphertextTooShort {
                actual: sealed.len(),
                minimum: tag_len,
            });
        }

        let (ciphertext, tag) = sealed.split_at(sealed.len() - tag_len);
        let plaintext = self.open_detached(nonce, ciphertext, tag, aad)?;
        Ok(buffer::append(dst, &[plaintext.as_slice()]))
    }

    /// Verify `tag` over `(aad, nonce, ciphertext)` and decrypt.
    pub fn open_detached(
        &self,
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.check_nonce(nonce)?;

        if !self.tag.verify(aad, nonce, ciphertext, tag)? {
            debug!("rejecting ciphertext");
            return Err(CipherError::AuthenticationFailed);
        }

        let bs = self.cipher.block_size();
        if ciphertext.is_empty() || ciphertext.len() % bs != 0 {
            // Authentic but never produced by `seal`.
            debug!("rejecting ciphertext");
            return Err(CipherError::InvalidPadding);
        }

        let mut buf = Zeroizing::new(ciphertext.to_vec());
        block::cbc_decrypt(&self.cipher, nonce, &mut buf);

        let len = match self.padding.unpad(&buf, bs) {
            Ok(plaintext) => plaintext.len(),
            Err(e) => {
                debug!("rejecting ciphertext");
                return Err(e);
            }
        };
        buf.truncate(len);
        Ok(buf)
    }

    fn check_nonce(&self, nonce: &[u8]) -> Result<()> {
        let expected = self.nonce_size();
        if nonce.len() != expected {
            return Err(CipherError::InvalidNonce {
                expected,
                actual: nonce.len(),
            });
        }
        Ok(())
    }
}

impl<C, P> std::fmt::Debug for CbcHmac<C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbcHmac")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NONCE_SIZE;
    use proptest::prelude::*;

    fn key(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    fn ctx128() -> AesCbcHmac {
        CbcHmac::aes(&key(32)).unwrap()
    }

    const NONCE: [u8; NONCE_SIZE] = [0x1au8; NONCE_SIZE];

    #[test]
    fn test_sizes_per_key_length() {
        for (len, tag, hash) in [
            (32, 16, IntegrityHash::Sha256),
            (48, 24, IntegrityHash::Sha384),
            (64, 32, IntegrityHash::Sha512),
        ] {
            let ctx = CbcHmac::aes(&key(len)).unwrap();
            assert_eq!(ctx.nonce_size(), 16);
            assert_eq!(ctx.tag_size(), tag);
            assert_eq!(ctx.overhead(), 16 + tag);
            assert_eq!(ctx.integrity_hash(), hash);
        }
    }

    #[test]
    fn test_rejects_bad_combined_keys() {
        for len in [0, 16, 31, 33, 40, 63, 96] {
            let err = CbcHmac::aes(&key(len)).unwrap_err();
            assert!(matches!(err, CipherError::InvalidKey(_)), "len {len}");
        }
    }

    #[test]
    fn test_factory_rejection_is_invalid_key() {
        let err = CbcHmac::<Aes>::new(&key(32), |_: &[u8]| Err::<Aes, _>("no cipher for you"))
            .unwrap_err();
        assert_eq!(err, CipherError::InvalidKey("no cipher for you".into()));
    }

    #[test]
    fn test_factory_receives_second_half() {
        let k = key(48);
        let mut seen = Vec::new();
        let _ = CbcHmac::<Aes>::new(&k, |enc: &[u8]| {
            seen = enc.to_vec();
            Aes::new(enc)
        })
        .unwrap();
        assert_eq!(seen, k[24..].to_vec());
    }

    #[test]
    fn test_roundtrip() {
        let ctx = ctx128();
        let sealed = ctx.seal(Vec::new(), &NONCE, b"attack at dawn", b"hdr").unwrap();
        let opened = ctx.open(Vec::new(), &NONCE, &sealed, b"hdr").unwrap();
        assert_eq!(opened, b"attack at dawn");
    }

    #[test]
    fn test_empty_plaintext_is_one_block_plus_tag() {
        let ctx = ctx128();
        let sealed = ctx.seal(Vec::new(), &NONCE, b"", b"").unwrap();
        assert_eq!(sealed.len(), 16 + 16);
        let opened = ctx.open(Vec::new(), &NONCE, &sealed, b"").unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn test_block_aligned_plaintext_gets_full_padding_block() {
        let ctx = ctx128();
        let sealed = ctx.seal(Vec::new(), &NONCE, &[0u8; 32], b"").unwrap();
        assert_eq!(sealed.len(), 32 + 16 + 16);
    }

    #[test]
    fn test_seal_appends_to_dst() {
        let ctx = ctx128();
        let bare = ctx.seal(Vec::new(), &NONCE, b"payload", b"").unwrap();
        let prefixed = ctx.seal(b"prefix".to_vec(), &NONCE, b"payload", b"").unwrap();
        assert_eq!(&prefixed[..6], b"prefix");
        assert_eq!(&prefixed[6..], &bare[..]);

        let opened = ctx.open(b"pt:".to_vec(), &NONCE, &bare, b"").unwrap();
        assert_eq!(opened, b"pt:payload");
    }

    #[test]
    fn test_seal_does_not_touch_plaintext() {
        let ctx = ctx128();
        let plaintext = b"leave me alone".to_vec();
        let copy = plaintext.clone();
        let _ = ctx.seal(Vec::new(), &NONCE, &plaintext, b"").unwrap();
        assert_eq!(plaintext, copy);
    }

    #[test]
    fn test_seal_is_deterministic() {
        let ctx = ctx128();
        let a = ctx.seal(Vec::new(), &NONCE, b"same", b"aad").unwrap();
        let b = ctx.seal(Vec::new(), &NONCE, b"same", b"aad").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_nonce_length_rejected() {
        let ctx = ctx128();
        let err = ctx.seal(Vec::new(), &[0u8; 12], b"x", b"").unwrap_err();
        assert_eq!(
            err,
            CipherError::InvalidNonce {
                expected: 16,
                actual: 12
            }
        );
        let err = ctx.open(Vec::new(), &[0u8; 24], &[0u8; 48], b"").unwrap_err();
        assert!(matches!(err, CipherError::InvalidNonce { .. }));
    }

    #[test]
    fn test_too_short_input() {
        let ctx = ctx128();
        for len in 0..16 {
            let err = ctx.open(Vec::new(), &NONCE, &vec![0u8; len], b"").unwrap_err();
            assert_eq!(
                err,
                CipherError::CiphertextTooShort {
                    actual: len,
                    minimum: 16
                }
            );
        }
    }

    #[test]
    fn test_tag_only_input_fails_authentication() {
        let ctx = ctx128();
        let err = ctx.open(Vec::new(), &NONCE, &[0u8; 16], b"").unwrap_err();
        assert_eq!(err, CipherError::AuthenticationFailed);
    }

    #[test]
    fn test_authentic_empty_body_is_padding_error() {
        // A tag over an empty ciphertext is valid HMAC but not a `seal` output.
        let ctx = ctx128();
        let tag = ctx.tag.compute(b"", &NONCE, b"").unwrap();
        let err = ctx.open(Vec::new(), &NONCE, &tag, b"").unwrap_err();
        assert_eq!(err, CipherError::InvalidPadding);
    }

    #[test]
    fn test_authentic_bad_padding_is_reported() {
        // Encrypt a block whose last byte is not valid PKCS#7, tag it honestly.
        let ctx = ctx128();
        let mut body = [0u8; 16];
        block::cbc_encrypt(&ctx.cipher, &NONCE, &mut body);
        let tag = ctx.tag.compute(b"", &NONCE, &body).unwrap();

        let err = ctx.open_detached(&NONCE, &body, &tag, b"").unwrap_err();
        assert_eq!(err, CipherError::InvalidPadding);
        assert!(err.is_decryption_failure());
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = ctx128().seal(Vec::new(), &NONCE, b"secret", b"").unwrap();
        let mut other = key(32);
        other[0] ^= 1;
        let ctx2 = CbcHmac::aes(&other).unwrap();
        assert_eq!(
            ctx2.open(Vec::new(), &NONCE, &sealed, b"").unwrap_err(),
            CipherError::AuthenticationFailed
        );
    }

    #[test]
    fn test_detached_matches_attached() {
        let ctx = CbcHmac::aes(&key(64)).unwrap();
        let (ct, tag) = ctx.seal_detached(&NONCE, b"detached", b"a").unwrap();
        let sealed = ctx.seal(Vec::new(), &NONCE, b"detached", b"a").unwrap();
        assert_eq!([ct.clone(), tag.clone()].concat(), sealed);

        let pt = ctx.open_detached(&NONCE, &ct, &tag, b"a").unwrap();
        assert_eq!(pt.as_slice(), b"detached");
    }

    #[test]
    fn test_concurrent_use() {
        let ctx = ctx128();
        std::thread::scope(|s| {
            for t in 0..8u8 {
                let ctx = &ctx;
                s.spawn(move || {
                    let nonce = [t; 16];
                    let msg = vec![t; 100 + t as usize];
                    let sealed = ctx.seal(Vec::new(), &nonce, &msg, &[t]).unwrap();
                    assert_eq!(ctx.open(Vec::new(), &nonce, &sealed, &[t]).unwrap(), msg);
                });
            }
        });
    }

    #[test]
    fn test_context_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AesCbcHmac>();
    }

    #[test]
    fn test_debug_redacts_keys() {
        let dbg = format!("{:?}", ctx128());
        assert!(dbg.contains("REDACTED"));
    }

    fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
        prop_oneof![Just(32usize), Just(48usize), Just(64usize)]
            .prop_flat_map(|len| proptest::collection::vec(any::<u8>(), len))
    }

    proptest! {
        #[test]
        fn seal_open_roundtrip(
            key in key_strategy(),
            nonce in proptest::array::uniform16(any::<u8>()),
            plaintext in proptest::collection::vec(any::<u8>(), 0..=300),
            aad in proptest::collection::vec(any::<u8>(), 0..=64),
        ) {
            let ctx = CbcHmac::aes(&key).unwrap();
            let sealed = ctx.seal(Vec::new(), &nonce, &plaintext, &aad).unwrap();

            let padding = sealed.len() - ctx.tag_size() - plaintext.len();
            prop_assert!((1..=16).contains(&padding));

            let opened = ctx.open(Vec::new(), &nonce, &sealed, &aad).unwrap();
            prop_assert_eq!(opened, plaintext);
        }

        #[test]
        fn any_bit_flip_is_rejected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..=64),
            aad in proptest::collection::vec(any::<u8>(), 1..=32),
            target in 0usize..4,
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let ctx = ctx128();
            let mut nonce = NONCE;
            let mut aad = aad;
            let mut sealed = ctx.seal(Vec::new(), &nonce, &plaintext, &aad).unwrap();
            let body_len = sealed.len() - ctx.tag_size();

            match target {
                0 => sealed[index.index(body_len)] ^= 1 << bit,
                1 => sealed[body_len + index.index(ctx.tag_size())] ^= 1 << bit,
                2 => { let i = index.index(aad.len()); aad[i] ^= 1 << bit }
                _ => nonce[index.index(NONCE_SIZE)] ^= 1 << bit,
            }

            let err = ctx.open(Vec::new(), &nonce, &sealed, &aad).unwrap_err();
            prop_assert_eq!(err, CipherError::AuthenticationFailed);
        }

        #[test]
        fn truncation_never_panics(cut in 0usize..16) {
            let ctx = ctx128();
            let sealed = ctx.seal(Vec::new(), &NONCE, b"truncate me", b"").unwrap();
            let err = ctx.open(Vec::new(), &NONCE, &sealed[..cut], b"").unwrap_err();
            let is_too_short = matches!(err, CipherError::CiphertextTooShort { .. });
            prop_assert!(is_too_short);
        }
    }
}
