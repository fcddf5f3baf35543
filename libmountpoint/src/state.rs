//! Container runtime state, as handed to hooks on stdin.
//!
//! See the OCI runtime "state" document: the hook only consumes `bundle`,
//! `pid` and `status`; the remaining fields are kept for logging.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bundle::CONFIG_FILE;
use crate::error::HookError;
use crate::util::clean_path;

/// Directory under the bundle holding the container root filesystem.
pub const ROOTFS_DIR: &str = "rootfs";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerState {
    #[serde(default)]
    pub oci_version: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub pid: i32,
    pub bundle: PathBuf,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

impl ContainerState {
    /// Decode a single state document from `reader`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HookError> {
        serde_json::from_reader(reader).map_err(HookError::StateParse)
    }

    /// `<bundle>/config.json`
    pub fn config_path(&self) -> PathBuf {
        clean_path(&self.bundle.join(CONFIG_FILE))
    }

    /// `<bundle>/rootfs`
    pub fn rootfs_path(&self) -> PathBuf {
        clean_path(&self.bundle.join(ROOTFS_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_runtime_state() {
        let json = r#"{
            "ociVersion": "1.0.2",
            "id": "c1",
            "status": "created",
            "pid": 4422,
            "bundle": "/run/containers/c1/./userdata",
            "annotations": {"io.kubernetes.pod.name": "demo"}
        }"#;

        let state = ContainerState::from_reader(json.as_bytes()).unwrap();
        assert_eq!(state.pid, 4422);
        assert_eq!(state.status, "created");
        assert_eq!(
            state.config_path(),
            PathBuf::from("/run/containers/c1/userdata/config.json")
        );
        assert_eq!(
            state.rootfs_path(),
            PathBuf::from("/run/containers/c1/userdata/rootfs")
        );
        assert_eq!(state.annotations["io.kubernetes.pod.name"], "demo");
    }

    #[test]
    fn bundle_is_required() {
        let result = ContainerState::from_reader(r#"{"pid": 1, "status": "created"}"#.as_bytes());
        assert!(matches!(result, Err(HookError::StateParse(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        let result = ContainerState::from_reader("not json".as_bytes());
        assert!(matches!(result, Err(HookError::StateParse(_))));
    }
}
