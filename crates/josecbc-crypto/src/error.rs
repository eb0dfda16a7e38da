use thiserror::Error;

pub type Result<T> = std::result::Result<T, CipherError>;

/// Errors returned by the CBC-HMAC construction.
///
/// [`CipherError::AuthenticationFailed`] and [`CipherError::InvalidPadding`]
/// are distinct variants, but callers must treat them as the same fatal
/// outcome. Reporting which one occurred to a remote party reopens the CBC
/// padding-oracle channel; the tag check runs first, so padding errors are
/// only reachable with a valid tag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid nonce: expected {expected} bytes, got {actual}")]
    InvalidNonce { expected: usize, actual: usize },

    #[error("invalid ciphertext (too short): {actual} bytes, minimum {minimum}")]
    CiphertextTooShort { actual: usize, minimum: usize },

    #[error("invalid ciphertext (auth tag mismatch)")]
    AuthenticationFailed,

    #[error("invalid ciphertext (bad padding)")]
    InvalidPadding,
}

impl CipherError {
    /// True for every error that means "this ciphertext does not decrypt".
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            CipherError::CiphertextTooShort { .. }
                | CipherError::AuthenticationFailed
                | CipherError::InvalidPadding
        )
    }
}
