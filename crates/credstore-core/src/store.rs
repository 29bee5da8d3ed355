//! Load-mutate-save orchestration over one credential store file.

use std::path::{Path, PathBuf};

use tracing::debug;
use zeroize::Zeroizing;

use crate::encryptor::{mask, CredentialsEncryptor};
use crate::error::CredentialError;
use crate::keying::StoreLocator;
use crate::properties::OrderedProperties;

/// Service bound to one store file. Every operation is a self-contained
/// load-mutate-save pipeline: the store is read from disk, changed in
/// memory, and fully rewritten. Nothing is cached between calls, so two
/// services on the same locator always observe each other's writes (within
/// one process; concurrent external processes race, last writer wins).
pub struct CredentialStore {
    path: PathBuf,
    encryptor: CredentialsEncryptor,
}

impl CredentialStore {
    pub fn open(locator: &StoreLocator) -> Result<Self, CredentialError> {
        Ok(Self {
            path: locator.file_path(),
            encryptor: CredentialsEncryptor::with_passphrase(locator.passphrase())?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypt `value` and add it under `key`, overwriting an existing entry
    /// in place. Creates the store file and any missing parent directories
    /// on first use.
    pub fn add(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        if key.is_empty() {
            return Err(CredentialError::MissingKeyOrValue("key"));
        }
        debug!("add credentials with key '{}', value '{}'", key, mask(value));

        let mut props = OrderedProperties::load(&self.path)?;
        let encrypted = self.encryptor.encrypt(value)?;
        props.upsert(key, &encrypted);
        props.save(&self.path)
    }

    /// Remove the entry under `key` if present. Returns whether the key
    /// existed. The store is saved either way; rewriting an unchanged store
    /// is a known minor inefficiency that keeps the pipeline uniform.
    pub fn remove(&self, key: &str) -> Result<bool, CredentialError> {
        debug!("remove credentials with key '{}'", key);

        let mut props = OrderedProperties::load(&self.path)?;
        let removed = props.remove(key);
        props.save(&self.path)?;
        Ok(removed)
    }

    /// Read-only view of the raw store: `(key, ciphertext)` in file order.
    pub fn snapshot(&self) -> Result<Vec<(String, String)>, CredentialError> {
        let props = OrderedProperties::load(&self.path)?;
        Ok(props
            .entries()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect())
    }

    /// Read-only decrypted view: `(key, plaintext)` in file order. Fails on
    /// the first value that does not decrypt under this store's passphrase.
    pub fn snapshot_decrypted(
        &self,
    ) -> Result<Vec<(String, Zeroizing<String>)>, CredentialError> {
        let props = OrderedProperties::load(&self.path)?;
        props
            .entries()
            .map(|(k, v)| Ok((k.to_string(), self.encryptor.decrypt(v)?)))
            .collect()
    }

    /// Decrypt a single entry. `None` when the key is not in the store.
    pub fn get(&self, key: &str) -> Result<Option<Zeroizing<String>>, CredentialError> {
        let props = OrderedProperties::load(&self.path)?;
        match props.get(key) {
            Some(ciphertext) => Ok(Some(self.encryptor.decrypt(ciphertext)?)),
            None => Ok(None),
        }
    }
}
