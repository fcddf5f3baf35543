//! Static hook configuration.
//!
//! The configuration is loaded once per hook invocation from a JSON file
//! installed next to the hook binary:
//!
//! ```json
//! {
//!   "activation_flag": "MOUNTPOINT_HOOK",
//!   "program_path": "/usr/bin/mount-s3",
//!   "host_mountpoint": "/var/lib/mountpoint-hook/mnt",
//!   "container_mountpoint": "/mnt/s3"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HookError;
use crate::util::clean_path;

/// Location the runtime's hook definition points `--config` at by default.
pub const DEFAULT_CONFIG_PATH: &str = "/usr/share/oci/hooks/mountpoint_hookconfig.json";

/// Hook configuration shared read-only by every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    /// Name of the container environment variable that opts a container in
    /// when set to `"true"`. Empty means no container ever activates.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub activation_flag: String,
    /// Mount helper executable.
    #[serde(default)]
    pub program_path: PathBuf,
    /// Host directory the helper mounts the bucket on.
    #[serde(default)]
    pub host_mountpoint: PathBuf,
    /// Default target inside the container rootfs. May be left empty when
    /// every container sets `CONTAINER_MOUNTPOINT`.
    #[serde(default)]
    pub container_mountpoint: PathBuf,
}

impl HookConfig {
    /// Read and parse the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HookError> {
        let path = clean_path(path.as_ref());

        let data = std::fs::read(&path).map_err(|source| HookError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config: HookConfig =
            serde_json::from_slice(&data).map_err(|source| HookError::ConfigParse {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), ?config, "hook config loaded");
        Ok(config)
    }
}
