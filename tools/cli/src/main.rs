//! SleepCrypt CLI - Command line interface for passphrase-based encryption.
//!
//! This tool encrypts and decrypts small secrets (credentials, participant
//! identifiers) with keys derived from a passphrase.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use sleepcrypt_common::CipherInput;
use sleepcrypt_crypto::{token, CipherConfig, CipherService};

#[derive(Parser)]
#[command(name = "sleepcrypt")]
#[command(about = "SleepCrypt - Passphrase-based encryption of small secrets")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with fallback_passphrase, salt and iterations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Prompt for a passphrase instead of using the configured fallback.
    #[arg(short = 'P', long, global = true)]
    passphrase_prompt: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt text or a file into a token.
    Encrypt {
        /// Text to encrypt (default: read --input or stdin).
        #[arg(short, long, conflicts_with = "input")]
        text: Option<OsString>,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Decrypt a token back into text.
    Decrypt {
        /// Reject tokens older than this many seconds.
        #[arg(long, conflicts_with = "raw")]
        ttl: Option<u64>,

        /// Write raw bytes instead of requiring UTF-8 text.
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Print the URL-safe base64 key derived from the passphrase.
    DeriveKey,

    /// Show unauthenticated token metadata.
    Inspect {
        /// Token file (default: stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input file (default: stdin).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries tokens and plaintext.
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Encrypt { text, io } => {
            let service = CipherService::new(config).context("Invalid cipher configuration")?;
            let passphrase = read_passphrase(cli.passphrase_prompt, true)?;
            cmd_encrypt(&service, passphrase.as_ref().map(|p| p.as_slice()), text, &io)
        }

        Commands::Decrypt { ttl, raw, io } => {
            let service = CipherService::new(config).context("Invalid cipher configuration")?;
            let passphrase = read_passphrase(cli.passphrase_prompt, false)?;
            cmd_decrypt(&service, passphrase.as_ref().map(|p| p.as_slice()), ttl, raw, &io)
        }

        Commands::DeriveKey => {
            let service = CipherService::new(config).context("Invalid cipher configuration")?;
            let passphrase = read_passphrase(cli.passphrase_prompt, false)?;
            cmd_derive_key(&service, passphrase.as_ref().map(|p| p.as_slice()))
        }

        Commands::Inspect { input } => cmd_inspect(input.as_deref()),
    }
}

/// Build the cipher configuration from an optional file and the environment.
fn load_config(path: Option<&Path>) -> Result<CipherConfig> {
    let config = match path {
        Some(path) => CipherConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CipherConfig::default(),
    };

    config
        .with_env_overrides()
        .context("Invalid SLEEPCRYPT_* environment override")
}

/// Prompt for a passphrase securely, if requested.
fn read_passphrase(prompt: bool, confirm: bool) -> Result<Option<Zeroizing<Vec<u8>>>> {
    if !prompt {
        debug!("no passphrase given, using configured fallback");
        return Ok(None);
    }

    let first = Zeroizing::new(
        rpassword::prompt_password("Enter passphrase: ")
            .context("Failed to read passphrase")?
            .into_bytes(),
    );

    if confirm {
        let second = Zeroizing::new(
            rpassword::prompt_password("Confirm passphrase: ")
                .context("Failed to read passphrase")?
                .into_bytes(),
        );
        if first != second {
            anyhow::bail!("Passphrases do not match");
        }
    }

    Ok(Some(first))
}

/// Encrypt input into a token.
fn cmd_encrypt(
    service: &CipherService,
    passphrase: Option<&[u8]>,
    text: Option<OsString>,
    io: &IoArgs,
) -> Result<()> {
    let data = match text {
        Some(text) => CipherInput::try_from(text.as_os_str()).context("Invalid --text")?,
        None => CipherInput::Bytes(read_input(io.input.as_deref())?),
    };
    if data.is_empty() {
        warn!("Encrypting empty input");
    } else {
        info!("Encrypting {} bytes", data.len());
    }

    let mut token = service.encrypt(data, passphrase).context("Encryption failed")?;
    token.push(b'\n');
    write_output(io.output.as_deref(), &token)
}

/// Decrypt a token.
fn cmd_decrypt(
    service: &CipherService,
    passphrase: Option<&[u8]>,
    ttl: Option<u64>,
    raw: bool,
    io: &IoArgs,
) -> Result<()> {
    let input = read_input(io.input.as_deref())?;
    let token = trim_token(&input);

    let plaintext = match ttl {
        Some(secs) => service
            .decrypt_with_ttl(token, passphrase, Duration::from_secs(secs))
            .map(String::into_bytes),
        None if raw => service.decrypt_bytes(token, passphrase),
        None => service.decrypt(token, passphrase).map(String::into_bytes),
    }
    .context("Decryption failed")?;

    let plaintext = Zeroizing::new(plaintext);
    info!("Decrypted {} bytes", plaintext.len());
    write_output(io.output.as_deref(), &plaintext)
}

/// Print the derived key.
fn cmd_derive_key(service: &CipherService, passphrase: Option<&[u8]>) -> Result<()> {
    let key = service
        .derive_key(passphrase)
        .context("Key derivation failed")?;
    let encoded = Zeroizing::new(key.encode());
    println!("{}", encoded.as_str());
    Ok(())
}

/// Show token metadata.
fn cmd_inspect(input: Option<&Path>) -> Result<()> {
    let raw = read_input(input)?;
    let info = token::inspect(trim_token(&raw)).context("Not a valid token")?;

    println!("Token (unauthenticated):");
    println!("  Version: 0x{:02x}", info.version);
    match info.created_at() {
        Some(created) => {
            let age = Utc::now().signed_duration_since(created);
            println!("  Created: {} ({}s ago)", created.to_rfc3339(), age.num_seconds());
        }
        None => println!("  Created: out of range ({})", info.timestamp),
    }
    println!("  Ciphertext: {} bytes", info.ciphertext_len);

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data).context("Failed to write stdout")?;
            stdout.flush().context("Failed to write stdout")
        }
    }
}

/// Strip the surrounding whitespace files and terminals add to tokens.
fn trim_token(input: &[u8]) -> &[u8] {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    let end = input
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &input[start..end]
}
