//! josecbc: JWE AES_CBC_HMAC_SHA2 content encryption CLI
//!
//! Commands:
//!   keygen [--alg]                           - print a random base64url combined key
//!   seal [--alg] [--key] [--aad] <in> <out>  - encrypt a file into a JSON envelope
//!   open [--key] [--aad] <in> <out>          - verify and decrypt an envelope
//!   derive --secret [--alg] [--apu] [--apv]  - Concat KDF content key derivation
//!   config show                              - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use josecbc_core::config::JosecbcConfig;
use josecbc_core::types::decode_b64;
use josecbc_core::{jwe, Algorithm, Envelope, JoseError};
use josecbc_crypto::{generate_key, CombinedKey};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "josecbc",
    version,
    about = "JWE AES-CBC + HMAC-SHA2 authenticated encryption",
    long_about = "josecbc: seal and open files with A128CBC-HS256, A192CBC-HS384 and \
                  A256CBC-HS512, and derive content keys with the Concat KDF"
)]
struct Cli {
    /// Path to josecbc.toml configuration file
    #[arg(long, short = 'c', env = "JOSECBC_CONFIG", default_value = "josecbc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a random combined key (base64url)
    Keygen {
        /// Content encryption algorithm (default: cipher.default_alg)
        #[arg(long, short = 'a')]
        alg: Option<Algorithm>,
    },

    /// Encrypt a file into a JSON envelope
    Seal {
        /// Plaintext input file
        input: PathBuf,
        /// Envelope output file
        output: PathBuf,
        /// Content encryption algorithm (default: inferred from the key length)
        #[arg(long, short = 'a')]
        alg: Option<Algorithm>,
        /// Combined key, base64url (default: contents of cipher.key_file)
        #[arg(long, short = 'k', env = "JOSECBC_KEY", hide_env_values = true)]
        key: Option<String>,
        /// Additional authenticated data, stored in the envelope
        #[arg(long)]
        aad: Option<String>,
    },

    /// Verify and decrypt a JSON envelope
    Open {
        /// Envelope input file
        input: PathBuf,
        /// Plaintext output file
        output: PathBuf,
        /// Combined key, base64url (default: contents of cipher.key_file)
        #[arg(long, short = 'k', env = "JOSECBC_KEY", hide_env_values = true)]
        key: Option<String>,
        /// Additional authenticated data (overrides the envelope's aad)
        #[arg(long)]
        aad: Option<String>,
    },

    /// Derive a combined key from a shared secret with the Concat KDF
    Derive {
        /// Shared secret Z, base64url
        #[arg(long, short = 's', env = "JOSECBC_SECRET", hide_env_values = true)]
        secret: String,
        /// Content encryption algorithm (default: cipher.default_alg)
        #[arg(long, short = 'a')]
        alg: Option<Algorithm>,
        /// PartyUInfo (default: kdf.party_u_info)
        #[arg(long)]
        apu: Option<String>,
        /// PartyVInfo (default: kdf.party_v_info)
        #[arg(long)]
        apv: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;
    init_logging(&config.log.level, log_format(&config));

    match cli.command {
        Commands::Keygen { alg } => cmd_keygen(&config, alg),
        Commands::Seal {
            input,
            output,
            alg,
            key,
            aad,
        } => {
            let key = resolve_key(&config, key.as_deref()).await?;
            cmd_seal(&config, &key, alg, aad.as_deref(), &input, &output).await
        }
        Commands::Open {
            input,
            output,
            key,
            aad,
        } => {
            let key = resolve_key(&config, key.as_deref()).await?;
            cmd_open(&key, aad.as_deref(), &input, &output).await
        }
        Commands::Derive {
            secret,
            alg,
            apu,
            apv,
        } => cmd_derive(&config, &secret, alg, apu.as_deref(), apv.as_deref()),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<JosecbcConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        JosecbcConfig::from_toml(&content)
            .with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(JosecbcConfig::default())
    }
}

fn log_format(config: &JosecbcConfig) -> LogFormat {
    match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries keys and command output
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Key resolution ────────────────────────────────────────────────────────────

async fn resolve_key(config: &JosecbcConfig, key: Option<&str>) -> Result<CombinedKey> {
    if let Some(encoded) = key {
        return jwe::decode_key(encoded).context("parsing --key");
    }

    let path = config
        .cipher
        .key_file
        .as_deref()
        .context("no key given: pass --key or set cipher.key_file")?;
    let encoded = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading key file: {}", path.display()))?;
    jwe::decode_key(encoded.trim()).with_context(|| format!("parsing key file: {}", path.display()))
}

// ── `josecbc keygen` ──────────────────────────────────────────────────────────

fn cmd_keygen(config: &JosecbcConfig, alg: Option<Algorithm>) -> Result<()> {
    let alg = alg.unwrap_or(config.cipher.default_alg);
    let key = generate_key(alg.key_len()).context("generating key")?;
    tracing::info!(alg = %alg, "generated combined key");
    println!("{}", jwe::encode_key(&key));
    Ok(())
}

// ── `josecbc seal` ────────────────────────────────────────────────────────────

async fn cmd_seal(
    config: &JosecbcConfig,
    key: &CombinedKey,
    alg: Option<Algorithm>,
    aad: Option<&str>,
    input: &Path,
    output: &Path,
) -> Result<()> {
    let alg = seal_alg(config, key, alg);
    let plaintext = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;

    let envelope = jwe::seal(alg, key, &plaintext, aad.unwrap_or_default().as_bytes())
        .with_context(|| format!("sealing {}", input.display()))?;
    let json = envelope.to_json()?;

    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(
        alg = %alg,
        input = %input.display(),
        output = %output.display(),
        bytes = plaintext.len(),
        "sealed"
    );
    Ok(())
}

/// `--alg`, else the algorithm matching the key length, else the configured
/// default.
fn seal_alg(config: &JosecbcConfig, key: &CombinedKey, alg: Option<Algorithm>) -> Algorithm {
    alg.or_else(|| Algorithm::from_key_len(key.len()))
        .unwrap_or(config.cipher.default_alg)
}

// ── `josecbc open` ────────────────────────────────────────────────────────────

async fn cmd_open(
    key: &CombinedKey,
    aad: Option<&str>,
    input: &Path,
    output: &Path,
) -> Result<()> {
    let json = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let envelope = Envelope::from_json(&json)?;

    let plaintext = match jwe::open(&envelope, key, aad.map(str::as_bytes)) {
        Ok(plaintext) => plaintext,
        // Auth and padding failures are reported identically.
        Err(JoseError::Crypto(e)) if e.is_decryption_failure() => {
            anyhow::bail!("decryption failed: {}", input.display())
        }
        Err(e) => return Err(e.into()),
    };

    tokio::fs::write(output, plaintext.as_slice())
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(
        alg = %envelope.alg,
        input = %input.display(),
        output = %output.display(),
        "opened"
    );
    Ok(())
}

// ── `josecbc derive` ──────────────────────────────────────────────────────────

fn cmd_derive(
    config: &JosecbcConfig,
    secret: &str,
    alg: Option<Algorithm>,
    apu: Option<&str>,
    apv: Option<&str>,
) -> Result<()> {
    let key = derive(config, secret, alg, apu, apv)?;
    println!("{}", jwe::encode_key(&key));
    Ok(())
}

fn derive(
    config: &JosecbcConfig,
    secret: &str,
    alg: Option<Algorithm>,
    apu: Option<&str>,
    apv: Option<&str>,
) -> Result<CombinedKey> {
    let alg = alg.unwrap_or(config.cipher.default_alg);
    let secret = decode_b64("secret", secret)?;
    let apu = apu.or(config.kdf.party_u_info.as_deref()).unwrap_or_default();
    let apv = apv.or(config.kdf.party_v_info.as_deref()).unwrap_or_default();

    tracing::debug!(alg = %alg, apu, apv, "deriving content key");
    Ok(jwe::derive_key(alg, &secret, apu.as_bytes(), apv.as_bytes())?)
}

// ── `josecbc config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &JosecbcConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = config.to_toml().context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
