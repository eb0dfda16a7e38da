pub mod config;
pub mod error;
pub mod jwe;
pub mod types;

pub use config::JosecbcConfig;
pub use error::{JoseError, JoseResult};
pub use types::{Algorithm, Envelope};
