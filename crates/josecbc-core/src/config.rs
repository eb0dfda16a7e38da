use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{JoseError, JoseResult};
use crate::types::Algorithm;

/// Top-level configuration (loaded from josecbc.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JosecbcConfig {
    pub log: LogConfig,
    pub cipher: CipherConfig,
    pub kdf: KdfConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info); RUST_LOG takes precedence
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    /// Algorithm used by `seal` and `keygen` when --alg is not given
    pub default_alg: Algorithm,
    /// File holding a base64url combined key, used when --key is not given
    pub key_file: Option<PathBuf>,
}

/// Concat KDF party info defaults for `derive`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    pub party_u_info: Option<String>,
    pub party_v_info: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl JosecbcConfig {
    pub fn from_toml(s: &str) -> JoseResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| JoseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> JoseResult<String> {
        toml::to_string_pretty(self).map_err(|e| JoseError::Config(e.to_string()))
    }

    fn validate(&self) -> JoseResult<()> {
        match self.log.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(JoseError::Config(format!(
                "log.format must be \"text\" or \"json\", got {other:?}"
            ))),
        }
    }
}
