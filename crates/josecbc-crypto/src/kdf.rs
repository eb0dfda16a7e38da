//! Concat KDF (NIST SP 800-56A §5.8.1, single-step) as used by JWE ECDH-ES
//!
//! ```text
//! round(i) = H(be32(i) || Z || AlgorithmID || PartyUInfo || PartyVInfo || SuppPubInfo || SuppPrivInfo)
//! output   = round(1) || round(2) || ...
//! ```
//!
//! Exposed as a [`Read`] stream. Output is a pure function of the inputs:
//! reading N bytes gives the same bytes whatever the chunking of the reads.

use std::io::{self, Read};

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

/// Concat KDF over SHA-256, the JWE ECDH-ES default.
pub type ConcatKdfSha256 = ConcatKdf<Sha256>;

/// Deterministic, resumable Concat KDF byte stream.
pub struct ConcatKdf<D: Digest> {
    z: Zeroizing<Vec<u8>>,
    other_info: Vec<u8>,
    counter: u32,
    /// Unread tail of the last round.
    cache: Vec<u8>,
    _hash: std::marker::PhantomData<D>,
}

impl<D: Digest> ConcatKdf<D> {
    /// Build a KDF stream from the shared secret `z` and the OtherInfo fields.
    ///
    /// Fields are hashed exactly as given; JWE callers pass `AlgorithmID`,
    /// `PartyUInfo` and `PartyVInfo` through [`length_prefixed`] first.
    pub fn new(
        z: &[u8],
        algorithm_id: &[u8],
        party_u_info: &[u8],
        party_v_info: &[u8],
        supp_pub_info: &[u8],
        supp_priv_info: &[u8],
    ) -> Self {
        let other_info = [
            algorithm_id,
            party_u_info,
            party_v_info,
            supp_pub_info,
            supp_priv_info,
        ]
        .concat();

        Self {
            z: Zeroizing::new(z.to_vec()),
            other_info,
            counter: 1,
            cache: Vec::new(),
            _hash: std::marker::PhantomData,
        }
    }

    /// Read exactly `len` bytes into a zeroizing buffer.
    pub fn derive(&mut self, len: usize) -> io::Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(vec![0u8; len]);
        self.read_exact(&mut out)?;
        Ok(out)
    }

    fn next_round(&mut self) -> io::Result<()> {
        if self.counter == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "concat KDF round counter exhausted",
            ));
        }

        let mut h = D::new();
        h.update(self.counter.to_be_bytes());
        h.update(self.z.as_slice());
        h.update(&self.other_info);
        self.cache.extend_from_slice(&h.finalize());

        // Wraps to 0 after 2^32 - 1 rounds, which ends the stream.
        self.counter = self.counter.wrapping_add(1);
        Ok(())
    }
}

impl<D: Digest> Read for ConcatKdf<D> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < out.len() {
            if self.cache.is_empty() {
                self.next_round()?;
            }
            let n = self.cache.len().min(out.len() - written);
            out[written..written + n].copy_from_slice(&self.cache[..n]);
            self.cache.drain(..n);
            written += n;
        }
        Ok(written)
    }
}

impl<D: Digest> Drop for ConcatKdf<D> {
    fn drop(&mut self) {
        self.cache.zeroize();
    }
}

impl<D: Digest> std::fmt::Debug for ConcatKdf<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcatKdf")
            .field("z", &"[REDACTED]")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

/// Encode a JWE OtherInfo field as `be32(len(data)) || data`.
pub fn length_prefixed(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4 + data.len());
    out.extend_from_slice(&be32(data.len(), "OtherInfo field")?);
    out.extend_from_slice(data);
    Ok(out)
}

/// `SuppPubInfo` for JWE: the derived key length in bits as be32.
pub fn key_bits_info(key_len: usize) -> io::Result<[u8; 4]> {
    let bits = key_len.checked_mul(8).ok_or_else(|| too_long("key length"))?;
    be32(bits, "key length")
}

fn be32(n: usize, what: &str) -> io::Result<[u8; 4]> {
    u32::try_from(n)
        .map(u32::to_be_bytes)
        .map_err(|_| too_long(what))
}

fn too_long(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{what} does not fit in 32 bits"),
    )
}
