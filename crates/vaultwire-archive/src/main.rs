//! Vaultwire archive operator binary.
//!
//! # Usage
//!
//! ```bash
//! # Escrow a conversation key into the mirror (key hex on stdin)
//! vaultwire-archive escrow --store mirror.redb --salt operator.salt \
//!     --conversation conv-1 --version 2
//!
//! # Export a conversation's messages for an archival window
//! vaultwire-archive export --store mirror.redb --salt operator.salt \
//!     --messages messages.json --conversation conv-1 \
//!     --from 1700000000 --to 1700086400 --output report.json
//! ```
//!
//! The operator password is read from `VAULTWIRE_OPERATOR_PASSWORD` or,
//! failing that, from the first line of stdin. It never appears in argv.

use std::{
    collections::HashMap,
    io::BufRead as _,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vaultwire_archive::{
    ArchiveRecoveryService, DateRange, MemoryMessageArchive, RedbKeyStore, StoredMessage,
};
use vaultwire_crypto::SALT_SIZE;
use zeroize::Zeroize;

/// Vaultwire archive operator tool
#[derive(Parser, Debug)]
#[command(name = "vaultwire-archive")]
#[command(about = "Administrative export over the Vaultwire key mirror")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Escrow a conversation key into the mirror (key hex on stdin)
    Escrow {
        /// Path to the Redb mirror database
        #[arg(long)]
        store: PathBuf,

        /// Path to the operator salt file (created if missing)
        #[arg(long)]
        salt: PathBuf,

        /// Conversation to escrow for
        #[arg(long)]
        conversation: String,

        /// Key version being escrowed
        #[arg(long)]
        version: u64,
    },

    /// Decrypt a conversation's messages for an archival window
    Export {
        /// Path to the Redb mirror database
        #[arg(long)]
        store: PathBuf,

        /// Path to the operator salt file
        #[arg(long)]
        salt: PathBuf,

        /// JSON file mapping conversation ids to stored messages
        #[arg(long)]
        messages: PathBuf,

        /// Conversation to export
        #[arg(long)]
        conversation: String,

        /// Window start (unix seconds, inclusive)
        #[arg(long)]
        from: u64,

        /// Window end (unix seconds, inclusive)
        #[arg(long)]
        to: u64,

        /// Where to write the JSON export report
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match args.command {
        Command::Escrow { store, salt, conversation, version } => {
            let operator_salt = load_or_create_salt(&salt)?;
            let store = RedbKeyStore::open(&store)?;
            let service =
                ArchiveRecoveryService::new(store, MemoryMessageArchive::new(), operator_salt);

            let mut password = operator_password()?;
            let mut key = read_key_from_stdin()?;

            service.escrow_key(&conversation, &key, version, &password).await?;

            key.zeroize();
            password.zeroize();

            tracing::info!(conversation, version, "key escrowed into mirror");
        },
        Command::Export { store, salt, messages, conversation, from, to, output } => {
            let operator_salt = load_or_create_salt(&salt)?;
            let store = RedbKeyStore::open(&store)?;
            let archive = load_message_file(&messages)?;
            let service = ArchiveRecoveryService::new(store, archive, operator_salt);

            let mut password = operator_password()?;
            let range = DateRange { from_secs: from, to_secs: to };

            let report = service.export_decrypted(&conversation, range, &password).await?;
            password.zeroize();

            std::fs::write(&output, serde_json::to_vec_pretty(&report)?)?;

            tracing::info!(
                conversation,
                decrypted = report.decrypted_count,
                failed = report.failed_count,
                output = %output.display(),
                "export report written"
            );

            if report.failed_count > 0 {
                tracing::warn!(
                    failed = report.failed_count,
                    "some messages were emitted with ciphertext intact"
                );
            }
        },
    }

    Ok(())
}

/// Operator password from the environment, or the first line of stdin.
fn operator_password() -> Result<String, Box<dyn std::error::Error>> {
    if let Ok(password) = std::env::var("VAULTWIRE_OPERATOR_PASSWORD") {
        return Ok(password);
    }

    tracing::info!("reading operator password from stdin");
    read_stdin_line()
}

/// A 32-byte key, hex-encoded on one stdin line.
fn read_key_from_stdin() -> Result<[u8; 32], Box<dyn std::error::Error>> {
    tracing::info!("reading key hex from stdin");

    let mut line = read_stdin_line()?;
    let mut decoded = hex::decode(line.trim())?;
    line.zeroize();

    let key: [u8; 32] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected 32 bytes of key material, got {}", decoded.len()))?;
    decoded.zeroize();

    Ok(key)
}

fn read_stdin_line() -> Result<String, Box<dyn std::error::Error>> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

/// Load the operator salt, generating and persisting one on first use.
fn load_or_create_salt(path: &Path) -> Result<[u8; SALT_SIZE], Box<dyn std::error::Error>> {
    if path.exists() {
        let encoded = std::fs::read_to_string(path)?;
        let decoded = hex::decode(encoded.trim())?;
        let salt: [u8; SALT_SIZE] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| format!("salt file must hold {SALT_SIZE} bytes, got {}", decoded.len()))?;
        return Ok(salt);
    }

    let salt = vaultwire_crypto::generate_salt();
    std::fs::write(path, hex::encode(salt))?;
    tracing::info!(path = %path.display(), "generated new operator salt");

    Ok(salt)
}

/// Messages file: conversation id → stored messages.
fn load_message_file(path: &Path) -> Result<MemoryMessageArchive, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let map: HashMap<String, Vec<StoredMessage>> = serde_json::from_slice(&bytes)?;

    Ok(MemoryMessageArchive::from_map(map))
}
