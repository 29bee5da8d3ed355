//! Password-based encryption of individual credential values.
//!
//! Values are encrypted with XChaCha20-Poly1305 under a key derived from the
//! store's passphrase. The random 24-byte nonce travels in front of the
//! ciphertext and the whole payload is base64 encoded, so the result is safe
//! to place on one line of a text properties file.

use base64::{engine::general_purpose, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::CredentialError;
use crate::keying::derive_key;

pub const NONCE_LEN: usize = 24;

pub struct CredentialsEncryptor {
    key: Zeroizing<Vec<u8>>,
}

impl CredentialsEncryptor {
    pub fn with_passphrase(passphrase: &str) -> Result<Self, CredentialError> {
        let key = derive_key(passphrase)?;
        Ok(Self { key })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key));
        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| CredentialError::Crypto(format!("encrypt: {e}")))?;
        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(payload))
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt). A malformed
    /// encoding, a truncated payload and an authentication failure (wrong
    /// passphrase) all report the same way: the value is unreadable under
    /// this key.
    pub fn decrypt(&self, encoded: &str) -> Result<Zeroizing<String>, CredentialError> {
        let payload = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| CredentialError::DecryptionFailure)?;
        if payload.len() < NONCE_LEN {
            return Err(CredentialError::DecryptionFailure);
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::DecryptionFailure)?;
        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| CredentialError::DecryptionFailure)
    }
}

/// Mask a secret for log or terminal output: one `*` per character, so the
/// placeholder keeps the original length without leaking content.
pub fn mask(value: &str) -> String {
    "*".repeat(value.chars().count())
}
