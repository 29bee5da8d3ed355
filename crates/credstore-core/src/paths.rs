use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::CredentialError;

pub const STORE_DIR_ENV: &str = "CREDSTORE_HOME";

/// Default directory holding the credential store files. An explicit
/// `CREDSTORE_HOME` wins over the platform data directory.
pub fn store_dir() -> Result<PathBuf, CredentialError> {
    if let Ok(override_dir) = std::env::var(STORE_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }
    let dirs = ProjectDirs::from("com", "credstore", "credstore")
        .ok_or(CredentialError::StoreDirUnavailable)?;
    Ok(dirs.data_dir().to_path_buf())
}
