use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid passphrase: {0}")]
    InvalidPassphrase(&'static str),

    #[error("credential store {path} is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("value could not be decrypted; wrong passphrase or damaged store")]
    DecryptionFailure,

    #[error("missing required credentials {0}")]
    MissingKeyOrValue(&'static str),

    #[error("cannot determine credential store directory")]
    StoreDirUnavailable,

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
