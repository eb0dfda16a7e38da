//! josecbc-crypto: AEAD_AES_CBC_HMAC_SHA2 content encryption for JOSE
//!
//! Construction (RFC 7518 §5.2):
//!
//! ```text
//! combined key K (2k bytes)
//!   ├── MAC_KEY = K[0..k]   → HMAC-SHA-{256,384,512} (k = 16, 24, 32)
//!   └── ENC_KEY = K[k..2k]  → AES-{128,192,256}-CBC
//!
//! E = CBC-Encrypt(ENC_KEY, IV, PKCS7(P))
//! T = HMAC(MAC_KEY, A || IV || E || AL)[0..k]     AL = be64(len(A) * 8)
//! output = E || T
//! ```
//!
//! The block cipher and padding scheme are pluggable through [`BlockCipher`]
//! and [`Padding`]; [`Aes`] and [`Pkcs7`] are the stock implementations.
//! [`ConcatKdf`] produces the combined key from an ECDH-ES shared secret.

pub mod aead;
pub mod block;
pub mod buffer;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod padding;
pub mod tag;

pub use aead::{AesCbcHmac, CbcHmac};
pub use block::{Aes, BlockCipher};
pub use error::{CipherError, Result};
pub use kdf::{ConcatKdf, ConcatKdfSha256};
pub use keys::{generate_key, generate_nonce, CombinedKey};
pub use padding::{Padding, Pkcs7};
pub use tag::IntegrityHash;

/// AES block size, which is also the CBC IV length
pub const BLOCK_SIZE: usize = 16;

/// Size of a nonce for the AES-based constructions
pub const NONCE_SIZE: usize = BLOCK_SIZE;
