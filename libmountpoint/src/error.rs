//! Hook error types.
//!
//! Every fallible operation in `libmountpoint` returns [`HookError`]. The
//! library never terminates the process; the binary decides which errors are
//! fatal and which are logged and swallowed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the activation-and-provisioning pipeline.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook configuration file could not be read.
    #[error("unable to read hook config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The hook configuration file is not valid JSON for [`crate::HookConfig`].
    #[error("unable to parse hook config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The container state document supplied on stdin could not be decoded.
    #[error("unable to decode container state: {0}")]
    StateParse(#[source] serde_json::Error),

    /// The bundle `config.json` could not be read.
    #[error("unable to read bundle config {}: {source}", .path.display())]
    BundleConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bundle `config.json` is malformed.
    #[error("unable to parse bundle config {}: {source}", .path.display())]
    BundleConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing or persisting the bundle `config.json` failed.
    #[error("unable to write bundle config {}: {source}", .path.display())]
    BundleConfigWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The resolved mount request cannot be provisioned.
    #[error("invalid mount request: {0}")]
    InvalidRequest(String),

    /// A mount point directory could not be created.
    #[error("unable to create directory {}: {source}", .path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The external mount helper failed to launch or exited unsuccessfully.
    #[error("mount helper {} failed: {reason}", .program.display())]
    MountHelperExecution { program: PathBuf, reason: String },

    /// The kernel rejected the bind mount.
    #[error("bind mount {} -> {} failed: {source}", .src.display(), .target.display())]
    BindMount {
        src: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = HookError::InvalidRequest("S3 bucket name is empty".into());
        assert_eq!(
            err.to_string(),
            "invalid mount request: S3 bucket name is empty"
        );

        let err = HookError::BindMount {
            src: "/mnt/s3".into(),
            target: "/bundle/rootfs/mnt".into(),
            source: io::Error::from_raw_os_error(1),
        };
        assert!(
            err.to_string()
                .starts_with("bind mount /mnt/s3 -> /bundle/rootfs/mnt failed:")
        );
    }
}
