use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use credstore_core::encryptor::mask;
use credstore_core::paths::store_dir;
use credstore_core::{CredentialError, CredentialStore, StoreLocator};
use tracing::debug;

const PASSPHRASE_ENV: &str = "CREDSTORE_PASSPHRASE";
const KEY_ENV: &str = "CREDSTORE_KEY";
const VALUE_ENV: &str = "CREDSTORE_VALUE";

#[derive(Parser)]
#[command(name = "credstore")]
#[command(about = "Encrypted credential store for build secrets", long_about = None)]
struct Cli {
    /// Passphrase selecting and unlocking the store; defaults to the
    /// built-in passphrase
    #[arg(long, global = true)]
    passphrase: Option<String>,

    /// Directory holding the store files
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add or update a credential
    Add {
        /// The credentials key
        #[arg(long)]
        key: Option<String>,

        /// The credentials value; prompted for interactively when not given
        #[arg(long)]
        value: Option<String>,
    },

    /// Remove a credential
    Remove {
        /// The credentials key
        #[arg(long)]
        key: Option<String>,
    },

    /// List stored credential keys with masked values
    List,

    /// Read a single credential
    Get {
        /// The credentials key
        #[arg(long)]
        key: Option<String>,

        /// Print the decrypted value instead of a masked placeholder
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store_dir = match cli.store_dir {
        Some(dir) => dir,
        None => store_dir()?,
    };
    let locator = match cli
        .passphrase
        .or_else(|| std::env::var(PASSPHRASE_ENV).ok())
    {
        Some(passphrase) => StoreLocator::new(passphrase, store_dir)?,
        None => StoreLocator::with_default_passphrase(store_dir),
    };
    debug!("using credential store {}", locator.file_path().display());
    let store = CredentialStore::open(&locator)?;

    match cli.command {
        Commands::Add { key, value } => {
            let key = required(key, KEY_ENV, "key")?;
            let value = match value.or_else(|| std::env::var(VALUE_ENV).ok()) {
                Some(value) => value,
                None => rpassword::prompt_password(format!("Value for '{key}': "))?,
            };
            store
                .add(&key, &value)
                .with_context(|| format!("failed to add credentials '{key}'"))?;
            println!("Added credentials '{}' = {}", key, mask(&value));
        }

        Commands::Remove { key } => {
            let key = required(key, KEY_ENV, "key")?;
            let removed = store
                .remove(&key)
                .with_context(|| format!("failed to remove credentials '{key}'"))?;
            if removed {
                println!("Removed credentials '{key}'");
            } else {
                println!("No credentials stored under '{key}'");
            }
        }

        Commands::List => {
            let entries = store
                .snapshot_decrypted()
                .context("failed to list credentials")?;
            if entries.is_empty() {
                println!("Credential store {} is empty", store.path().display());
            }
            for (key, value) in entries {
                println!("{} = {}", key, mask(&value));
            }
        }

        Commands::Get { key, show } => {
            let key = required(key, KEY_ENV, "key")?;
            let value = store
                .get(&key)
                .with_context(|| format!("failed to read credentials '{key}'"))?;
            match value {
                Some(value) if show => println!("{}", &*value),
                Some(value) => println!("{} = {}", key, mask(&value)),
                None => anyhow::bail!("no credentials stored under '{key}'"),
            }
        }
    }
    Ok(())
}

/// Caller inputs follow the flag, then the ambient environment; a credential
/// operation without its inputs fails loudly.
fn required(arg: Option<String>, env: &str, what: &'static str) -> Result<String> {
    if let Some(value) = arg {
        return Ok(value);
    }
    if let Ok(value) = std::env::var(env) {
        return Ok(value);
    }
    Err(CredentialError::MissingKeyOrValue(what).into())
}
