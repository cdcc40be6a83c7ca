//! Persisted user settings: default folder and API key.
//!
//! Stored as a small JSON document using the same keys as the vault plugin's
//! data file, so one file can serve both:
//!
//! ```json
//! { "defaultFolder": "/Conversions/", "apiKey": "" }
//! ```
//!
//! Settings are only read at startup and turned into a
//! [`ConversionConfig`]; nothing in the pipeline reads them directly.

use crate::config::{ConversionConfigBuilder, DEFAULT_FOLDER};
use crate::error::Pdf2MdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub default_folder: String,
    pub api_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_folder: DEFAULT_FOLDER.to_string(),
            api_key: String::new(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("default_folder", &self.default_folder)
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "<unset>" })
            .finish()
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file does not exist.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Pdf2MdError> {
        let path = path.as_ref();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Pdf2MdError::Storage {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                })
            }
        };
        serde_json::from_str(&raw).map_err(|e| {
            Pdf2MdError::InvalidConfig(format!("settings file '{}': {e}", path.display()))
        })
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Pdf2MdError> {
        let path = path.as_ref();
        let storage_err = |e: std::io::Error| Pdf2MdError::Storage {
            path: path.display().to_string(),
            detail: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(storage_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Pdf2MdError::Internal(format!("serialise settings: {e}")))?;
        tokio::fs::write(path, json).await.map_err(storage_err)?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Seed a config builder with these settings.
    pub fn apply(&self, builder: ConversionConfigBuilder) -> ConversionConfigBuilder {
        builder
            .api_key(self.api_key.clone())
            .default_folder(self.default_folder.clone())
    }
}
