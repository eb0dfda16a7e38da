use josecbc_crypto::CipherError;
use thiserror::Error;

use crate::types::Algorithm;

pub type JoseResult<T> = Result<T, JoseError>;

#[derive(Debug, Error)]
pub enum JoseError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown content encryption algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("malformed envelope: {0}")]
    Envelope(String),

    #[error("{alg} needs a {expected}-byte key, got {actual}")]
    KeyMismatch {
        alg: Algorithm,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Crypto(#[from] CipherError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
