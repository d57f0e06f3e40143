// Persistent storage for the Gemini API key (config/credentials.toml).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Shortest key accepted, counted after trimming.
pub const MIN_KEY_CHARS: usize = 20;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("API key must be at least {min} characters, got {len}")]
    TooShort { min: usize, len: usize },

    #[error("failed to access credential file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse credential file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to encode credential file: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gemini_api_key: Option<String>,
}

/// Trim and length-check a candidate key.
pub fn validate_key(raw: &str) -> Result<String, CredentialError> {
    let key = raw.trim();
    let len = key.chars().count();
    if len < MIN_KEY_CHARS {
        return Err(CredentialError::TooShort {
            min: MIN_KEY_CHARS,
            len,
        });
    }
    Ok(key.to_string())
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored key, or `None` when the file or the key is absent or blank.
    pub fn load(&self) -> Result<Option<String>, CredentialError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: CredentialsFile = toml::from_str(&text).map_err(|source| CredentialError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(file
            .gemini_api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()))
    }

    /// Validate and persist a key, returning the trimmed value.
    pub fn save(&self, raw: &str) -> Result<String, CredentialError> {
        let key = validate_key(raw)?;
        let text = toml::to_string(&CredentialsFile {
            gemini_api_key: Some(key.clone()),
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CredentialError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, text).map_err(|source| CredentialError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "API key saved");
        Ok(key)
    }

    /// Remove the stored key. A missing file is not an error.
    pub fn clear(&self) -> Result<(), CredentialError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "API key cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CredentialError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
