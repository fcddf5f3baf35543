//! Read-modify-write access to the bundle `config.json`.
//!
//! The document is kept as an ordered JSON object so that every field, known
//! to this crate or not, survives a read/write cycle unchanged and in its
//! original key order. Only `process.env` is interpreted.

use std::fs::{OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::HookError;
use crate::util::clean_path;

/// File name of the runtime config inside a bundle.
pub const CONFIG_FILE: &str = "config.json";

/// The config may carry credentials in `process.env`.
const CONFIG_FILE_MODE: u32 = 0o600;

/// Typed view over the parts of `process` the hook reads.
#[derive(Debug, Default, Deserialize)]
struct ProcessView {
    #[serde(default)]
    env: Option<Vec<String>>,
}

/// An OCI runtime config document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BundleConfig {
    document: Map<String, Value>,
    env: Vec<String>,
}

impl BundleConfig {
    /// Parse a config document from raw bytes.
    ///
    /// Fails when the document is not a JSON object or when `process.env` is
    /// present but not an array of strings.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        let document: Map<String, Value> = serde_json::from_slice(data)?;
        let env = match document.get("process") {
            Some(process) if !process.is_null() => {
                ProcessView::deserialize(process)?.env.unwrap_or_default()
            }
            _ => Vec::new(),
        };
        Ok(Self { document, env })
    }

    /// Read `path` (cleaned first) and parse it.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, HookError> {
        let path = clean_path(path.as_ref());

        let data = std::fs::read(&path).map_err(|source| HookError::BundleConfigRead {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_slice(&data).map_err(|source| HookError::BundleConfigParse {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), env_len = config.env.len(), "bundle config read");
        Ok(config)
    }

    /// Serialize the document and replace the content of `path` with it.
    ///
    /// The file ends up owner read/write only, also when it existed before
    /// with a wider mode.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), HookError> {
        let path = clean_path(path.as_ref());
        let write_err = |source: io::Error| HookError::BundleConfigWrite {
            path: path.clone(),
            source,
        };

        let data = serde_json::to_vec(&self.document).map_err(|e| write_err(e.into()))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(CONFIG_FILE_MODE)
            .open(&path)
            .map_err(write_err)?;
        file.set_permissions(Permissions::from_mode(CONFIG_FILE_MODE))
            .map_err(write_err)?;
        file.write_all(&data).map_err(write_err)?;
        file.flush().map_err(write_err)?;

        info!(path = %path.display(), "bundle config written");
        Ok(())
    }

    /// `process.env` in document order; empty when absent.
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// The raw document.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }
}
