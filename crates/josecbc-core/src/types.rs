use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{JoseError, JoseResult};

/// JWE content encryption algorithms of the AES_CBC_HMAC_SHA2 family
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    #[serde(rename = "A128CBC-HS256")]
    A128CbcHs256,
    #[serde(rename = "A192CBC-HS384")]
    A192CbcHs384,
    #[serde(rename = "A256CBC-HS512")]
    A256CbcHs512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::A128CbcHs256,
        Algorithm::A192CbcHs384,
        Algorithm::A256CbcHs512,
    ];

    /// The JWE `enc` header value.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::A128CbcHs256 => "A128CBC-HS256",
            Algorithm::A192CbcHs384 => "A192CBC-HS384",
            Algorithm::A256CbcHs512 => "A256CBC-HS512",
        }
    }

    /// Combined key length in bytes (MAC key + encryption key).
    pub fn key_len(self) -> usize {
        match self {
            Algorithm::A128CbcHs256 => 32,
            Algorithm::A192CbcHs384 => 48,
            Algorithm::A256CbcHs512 => 64,
        }
    }

    /// The algorithm whose combined key is `len` bytes long.
    pub fn from_key_len(len: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key_len() == len)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = JoseError;

    fn from_str(s: &str) -> JoseResult<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| JoseError::UnknownAlgorithm(s.to_string()))
    }
}

/// Sealed message as written to disk (JSON, base64url fields without padding)
///
/// Mirrors the JWE JSON fields that carry CBC-HMAC output: `iv`,
/// `ciphertext`, `tag`, plus the associated data when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub alg: Algorithm,
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad: Option<String>,
}

impl Envelope {
    pub fn new(alg: Algorithm, iv: &[u8], ciphertext: &[u8], tag: &[u8], aad: &[u8]) -> Self {
        Self {
            alg,
            iv: encode_b64(iv),
            ciphertext: encode_b64(ciphertext),
            tag: encode_b64(tag),
            aad: (!aad.is_empty()).then(|| encode_b64(aad)),
        }
    }

    pub fn iv_bytes(&self) -> JoseResult<Vec<u8>> {
        decode_b64("iv", &self.iv)
    }

    pub fn ciphertext_bytes(&self) -> JoseResult<Vec<u8>> {
        decode_b64("ciphertext", &self.ciphertext)
    }

    pub fn tag_bytes(&self) -> JoseResult<Vec<u8>> {
        decode_b64("tag", &self.tag)
    }

    /// Associated data, empty when the envelope carries none.
    pub fn aad_bytes(&self) -> JoseResult<Vec<u8>> {
        match &self.aad {
            Some(aad) => decode_b64("aad", aad),
            None => Ok(Vec::new()),
        }
    }

    pub fn to_json(&self) -> JoseResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| JoseError::Envelope(e.to_string()))
    }

    pub fn from_json(s: &str) -> JoseResult<Self> {
        serde_json::from_str(s).map_err(|e| JoseError::Envelope(e.to_string()))
    }
}

/// base64url without padding, as used throughout JOSE
pub fn encode_b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a base64url (no padding) value, naming `field` in the error.
pub fn decode_b64(field: &str, value: &str) -> JoseResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value.trim())
        .map_err(|e| JoseError::Envelope(format!("{field}: invalid base64url: {e}")))
}
