//! JWE content encryption on top of `josecbc-crypto`
//!
//! Binds an [`Algorithm`] to a combined key, produces and consumes
//! [`Envelope`]s, and derives content keys with the JWE Concat KDF.

use josecbc_crypto::kdf::{key_bits_info, length_prefixed};
use josecbc_crypto::{generate_nonce, AesCbcHmac, CombinedKey, ConcatKdfSha256};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{JoseError, JoseResult};
use crate::types::{decode_b64, encode_b64, Algorithm, Envelope};

/// Encrypt `plaintext` under a fresh random IV.
pub fn seal(
    alg: Algorithm,
    key: &CombinedKey,
    plaintext: &[u8],
    aad: &[u8],
) -> JoseResult<Envelope> {
    seal_with_iv(alg, key, &generate_nonce(), plaintext, aad)
}

/// Encrypt `plaintext` under a caller-supplied IV. The IV must not repeat
/// under the same key.
pub fn seal_with_iv(
    alg: Algorithm,
    key: &CombinedKey,
    iv: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> JoseResult<Envelope> {
    let aead = context(alg, key)?;
    let (ciphertext, tag) = aead.seal_detached(iv, plaintext, aad)?;
    debug!(alg = %alg, plaintext_len = plaintext.len(), "sealed");
    Ok(Envelope::new(alg, iv, &ciphertext, &tag, aad))
}

/// Verify and decrypt `envelope`.
///
/// `aad` replaces the envelope's own associated data when given.
pub fn open(
    envelope: &Envelope,
    key: &CombinedKey,
    aad: Option<&[u8]>,
) -> JoseResult<Zeroizing<Vec<u8>>> {
    let aead = context(envelope.alg, key)?;
    let iv = envelope.iv_bytes()?;
    let ciphertext = envelope.ciphertext_bytes()?;
    let tag = envelope.tag_bytes()?;
    let aad = match aad {
        Some(aad) => aad.to_vec(),
        None => envelope.aad_bytes()?,
    };

    let plaintext = aead.open_detached(&iv, &ciphertext, &tag, &aad)?;
    debug!(alg = %envelope.alg, plaintext_len = plaintext.len(), "opened");
    Ok(plaintext)
}

/// Derive a content key for `alg` from a shared secret (JWE ECDH-ES
/// "Direct Key Agreement" with the `enc` value as AlgorithmID).
pub fn derive_key(
    alg: Algorithm,
    secret: &[u8],
    party_u_info: &[u8],
    party_v_info: &[u8],
) -> JoseResult<CombinedKey> {
    let mut kdf = ConcatKdfSha256::new(
        secret,
        &length_prefixed(alg.name().as_bytes())?,
        &length_prefixed(party_u_info)?,
        &length_prefixed(party_v_info)?,
        &key_bits_info(alg.key_len())?,
        &[],
    );
    let mut derived = kdf.derive(alg.key_len())?;
    Ok(CombinedKey::from_bytes(std::mem::take(&mut *derived))?)
}

pub fn encode_key(key: &CombinedKey) -> String {
    encode_b64(key.as_bytes())
}

/// Parse a base64url combined key.
pub fn decode_key(encoded: &str) -> JoseResult<CombinedKey> {
    let bytes = decode_b64("key", encoded)?;
    Ok(CombinedKey::from_bytes(bytes)?)
}

fn context(alg: Algorithm, key: &CombinedKey) -> JoseResult<AesCbcHmac> {
    if key.len() != alg.key_len() {
        return Err(JoseError::KeyMismatch {
            alg,
            expected: alg.key_len(),
            actual: key.len(),
        });
    }
    Ok(AesCbcHmac::aes(key.as_bytes())?)
}
