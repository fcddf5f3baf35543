//! Activation resolution: turns a container environment into a
//! [`MountRequest`].

use std::path::Path;

use crate::config::HookConfig;
use crate::env;

/// Overrides [`HookConfig::container_mountpoint`] for one container.
pub const CONTAINER_MOUNTPOINT: &str = "CONTAINER_MOUNTPOINT";
pub const S3_BUCKET: &str = "S3_BUCKET";
pub const S3_PREFIX: &str = "S3_PREFIX";
pub const S3_ENDPOINT_URL: &str = "S3_ENDPOINT_URL";

/// Value the activation flag must carry for the hook to act.
pub const ACTIVATED: &str = "true";

/// What one container asked for. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountRequest {
    pub activation_flag: String,
    pub container_mountpoint: String,
    pub s3_bucket_name: String,
    pub s3_endpoint_url: String,
    pub s3_prefix: String,
}

impl MountRequest {
    /// Resolve the request from a container's `process.env`.
    ///
    /// Unrecognized and malformed entries are ignored; duplicates resolve to
    /// their last occurrence. The variable named by
    /// [`HookConfig::activation_flag`] feeds `activation_flag`; an empty
    /// configured name never matches anything.
    pub fn resolve<S: AsRef<str>>(env: &[S], config: &HookConfig) -> Self {
        if env.is_empty() {
            return Self::default();
        }

        let mut vars = env::parse(env);
        let mut take = |key: &str| vars.remove(key).unwrap_or_default();

        let activation_flag = if config.activation_flag.is_empty() {
            String::new()
        } else {
            take(config.activation_flag.as_str())
        };

        Self {
            activation_flag,
            container_mountpoint: take(CONTAINER_MOUNTPOINT),
            s3_bucket_name: take(S3_BUCKET),
            s3_endpoint_url: take(S3_ENDPOINT_URL),
            s3_prefix: take(S3_PREFIX),
        }
    }

    /// No recognized variable was present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_activated(&self) -> bool {
        self.activation_flag == ACTIVATED
    }

    /// Target inside the rootfs: the per-container override, else the
    /// configured default.
    pub fn container_mountpoint<'a>(&'a self, config: &'a HookConfig) -> &'a Path {
        if self.container_mountpoint.is_empty() {
            &config.container_mountpoint
        } else {
            Path::new(&self.container_mountpoint)
        }
    }
}
