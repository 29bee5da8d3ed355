use std::path::PathBuf;

use argon2::{Argon2, Params};
use md5::{Digest, Md5};
use zeroize::Zeroizing;

use crate::error::CredentialError;

/// Passphrase used when the caller does not supply one. Visible in source on
/// purpose: it namespaces the default store file, it does not protect it.
pub const DEFAULT_PASSPHRASE: &str = ">>Default passphrase to encrypt passwords!<<";

pub const DEFAULT_STORE_FILE: &str = "gradle.encrypted.properties";

pub const KDF_TIME_COST: u32 = 3;
pub const KDF_MEMORY_COST: u32 = 65536; // 64MB
pub const KDF_PARALLELISM: u32 = 4;
pub const DERIVED_KEY_LEN: usize = 32;

// Fixed salt: key derivation must be deterministic per passphrase so values
// written by earlier invocations stay decryptable.
const KDF_SALT: &[u8; 16] = b"credstore.pbe.v1";

/// Derive the store file name from the passphrase. Every distinct passphrase
/// maps to its own file; the default passphrase keeps a human-memorable name.
///
/// The MD5-based naming scheme is load-bearing: changing it orphans every
/// existing custom-passphrase store. The digest only namespaces files and
/// carries no security weight.
pub fn resolve_file_name(passphrase: &str) -> String {
    if passphrase == DEFAULT_PASSPHRASE {
        DEFAULT_STORE_FILE.to_string()
    } else {
        let digest = Md5::digest(passphrase.as_bytes());
        format!("gradle.{}.encrypted.properties", hex::encode(digest))
    }
}

/// Derive 32 bytes of key material from the passphrase with Argon2id.
pub fn derive_key(passphrase: &str) -> Result<Zeroizing<Vec<u8>>, CredentialError> {
    let params = Params::new(
        KDF_MEMORY_COST,
        KDF_TIME_COST,
        KDF_PARALLELISM,
        Some(DERIVED_KEY_LEN),
    )
    .map_err(|e| CredentialError::Crypto(format!("argon2 params: {e}")))?;
    let argon = Argon2::from(params);
    let mut key = Zeroizing::new(vec![0u8; DERIVED_KEY_LEN]);
    argon
        .hash_password_into(passphrase.as_bytes(), KDF_SALT, &mut key)
        .map_err(|e| CredentialError::Crypto(format!("argon2 derive: {e}")))?;
    Ok(key)
}

/// Resolves a passphrase and store directory to one concrete backing file.
#[derive(Clone)]
pub struct StoreLocator {
    passphrase: Zeroizing<String>,
    store_dir: PathBuf,
}

// the passphrase stays out of debug output
impl std::fmt::Debug for StoreLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLocator")
            .field("store_dir", &self.store_dir)
            .field("file", &resolve_file_name(&self.passphrase))
            .finish()
    }
}

impl StoreLocator {
    /// Locator for an explicitly supplied passphrase. Empty passphrases are
    /// rejected; use [`StoreLocator::with_default_passphrase`] when the
    /// caller provided none.
    pub fn new(
        passphrase: impl Into<String>,
        store_dir: impl Into<PathBuf>,
    ) -> Result<Self, CredentialError> {
        let passphrase = passphrase.into();
        if passphrase.is_empty() {
            return Err(CredentialError::InvalidPassphrase(
                "passphrase must not be empty",
            ));
        }
        Ok(Self {
            passphrase: Zeroizing::new(passphrase),
            store_dir: store_dir.into(),
        })
    }

    pub fn with_default_passphrase(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            passphrase: Zeroizing::new(DEFAULT_PASSPHRASE.to_string()),
            store_dir: store_dir.into(),
        }
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn file_path(&self) -> PathBuf {
        self.store_dir.join(resolve_file_name(&self.passphrase))
    }
}
