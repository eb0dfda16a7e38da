//! Block padding capability and PKCS#7
//!
//! `pad` always appends between 1 and `block_size` bytes, so a block-aligned
//! input gains a full block. That keeps `unpad` unambiguous.

use subtle::{ConditionallySelectable, ConstantTimeLess};

use crate::error::{CipherError, Result};

/// Largest block size PKCS#7 can express (the pad length is one byte).
pub const MAX_BLOCK_SIZE: usize = 255;

/// Reversible padding to a multiple of the block size.
pub trait Padding {
    /// Append padding to `buf`. `block_size` is in `1..=MAX_BLOCK_SIZE`.
    fn pad(&self, buf: &mut Vec<u8>, block_size: usize);

    /// Strip padding, returning the unpadded prefix of `buf`.
    ///
    /// Fails with [`CipherError::InvalidPadding`] on malformed input.
    fn unpad<'a>(&self, buf: &'a [u8], block_size: usize) -> Result<&'a [u8]>;
}

/// PKCS#7 padding (RFC 5652 §6.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct Pkcs7;

impl Padding for Pkcs7 {
    fn pad(&self, buf: &mut Vec<u8>, block_size: usize) {
        debug_assert!((1..=MAX_BLOCK_SIZE).contains(&block_size));
        let p = block_size - buf.len() % block_size;
        buf.resize(buf.len() + p, p as u8);
    }

    fn unpad<'a>(&self, buf: &'a [u8], block_size: usize) -> Result<&'a [u8]> {
        let Some(&last) = buf.last() else {
            return Err(CipherError::InvalidPadding);
        };
        let p = usize::from(last);
        if p == 0 || p > block_size || p > buf.len() {
            return Err(CipherError::InvalidPadding);
        }

        // Scan a fixed-size window so the loop does not depend on `p`.
        let window = block_size.min(buf.len());
        let mut bad = 0u8;
        for (i, &b) in buf[buf.len() - window..].iter().rev().enumerate() {
            let in_pad = (i as u8).ct_lt(&last);
            bad |= u8::conditional_select(&0, &(b ^ last), in_pad);
        }
        if bad != 0 {
            return Err(CipherError::InvalidPadding);
        }

        Ok(&buf[..buf.len() - p])
    }
}
