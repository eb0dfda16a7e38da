//! Block cipher capability and CBC mode
//!
//! CBC runs in place over whole blocks with an explicit IV. Callers are
//! responsible for block alignment; the AEAD layer pads before encrypting and
//! checks alignment before decrypting.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};

use crate::error::{CipherError, Result};
use crate::BLOCK_SIZE;

/// A keyed block cipher operating on single blocks.
///
/// Implementations must be reentrant: `&self` methods may be called from
/// many threads at once.
pub trait BlockCipher {
    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Encrypt one block in place. `block.len()` equals [`Self::block_size`].
    fn encrypt_block(&self, block: &mut [u8]);

    /// Decrypt one block in place. `block.len()` equals [`Self::block_size`].
    fn decrypt_block(&self, block: &mut [u8]);
}

/// AES with the key size picked from the key length.
///
/// Key schedules are zeroized on drop (`aes/zeroize`).
#[derive(Clone)]
pub enum Aes {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl Aes {
    /// Build an AES instance from a 16, 24 or 32 byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        let aes = match key.len() {
            16 => Aes128::new_from_slice(key).map(Aes::Aes128),
            24 => Aes192::new_from_slice(key).map(Aes::Aes192),
            32 => Aes256::new_from_slice(key).map(Aes::Aes256),
            n => return Err(invalid_key_len(n)),
        };
        aes.map_err(|_| invalid_key_len(key.len()))
    }

    /// Key size in bits.
    pub fn key_bits(&self) -> usize {
        match self {
            Aes::Aes128(_) => 128,
            Aes::Aes192(_) => 192,
            Aes::Aes256(_) => 256,
        }
    }
}

impl BlockCipher for Aes {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Aes::Aes128(c) => c.encrypt_block(block),
            Aes::Aes192(c) => c.encrypt_block(block),
            Aes::Aes256(c) => c.encrypt_block(block),
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Aes::Aes128(c) => c.decrypt_block(block),
            Aes::Aes192(c) => c.decrypt_block(block),
            Aes::Aes256(c) => c.decrypt_block(block),
        }
    }
}

impl std::fmt::Debug for Aes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes")
            .field("key_bits", &self.key_bits())
            .finish_non_exhaustive()
    }
}

/// CBC-encrypt `buf` in place.
///
/// `iv.len()` must equal the block size and `buf.len()` must be a multiple
/// of it.
pub fn cbc_encrypt<C: BlockCipher + ?Sized>(cipher: &C, iv: &[u8], buf: &mut [u8]) {
    let bs = cipher.block_size();
    debug_assert_eq!(iv.len(), bs);
    debug_assert_eq!(buf.len() % bs, 0);

    let mut prev = iv.to_vec();
    for block in buf.chunks_exact_mut(bs) {
        xor_in_place(block, &prev);
        cipher.encrypt_block(block);
        prev.copy_from_slice(block);
    }
}

/// CBC-decrypt `buf` in place. Same preconditions as [`cbc_encrypt`].
pub fn cbc_decrypt<C: BlockCipher + ?Sized>(cipher: &C, iv: &[u8], buf: &mut [u8]) {
    let bs = cipher.block_size();
    debug_assert_eq!(iv.len(), bs);
    debug_assert_eq!(buf.len() % bs, 0);

    let mut prev = iv.to_vec();
    let mut saved = vec![0u8; bs];
    for block in buf.chunks_exact_mut(bs) {
        saved.copy_from_slice(block);
        cipher.decrypt_block(block);
        xor_in_place(block, &prev);
        std::mem::swap(&mut prev, &mut saved);
    }
}

fn invalid_key_len(len: usize) -> CipherError {
    CipherError::InvalidKey(format!("AES key must be 16, 24 or 32 bytes, got {len}"))
}

fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
