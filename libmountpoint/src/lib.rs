//! # libmountpoint — object storage mounts for OCI containers
//!
//! `libmountpoint` is the core of an OCI runtime hook. Given the container
//! state the runtime passes on stdin, it reads the bundle `config.json`,
//! decides from the container's environment whether a bucket mount was
//! requested, mounts the bucket on the host with an external helper
//! (e.g. `mount-s3`) and bind-mounts the result into the container rootfs.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`config`] | [`HookConfig`], the hook's own static configuration. |
//! | [`state`] | [`ContainerState`] read from stdin. |
//! | [`bundle`] | [`BundleConfig`] read/write of `config.json`. |
//! | [`env`] | `KEY=VALUE` environment decoding. |
//! | [`request`] | [`MountRequest`] activation resolution. |
//! | [`provision`] | Host mount through the helper, [`CommandRunner`] capability. |
//! | [`mount`] | Bind mount into the rootfs, [`Mounter`] capability. |
//! | [`hook`] | [`Hook`] pipeline orchestration. |
//! | [`error`] | [`HookError`] covering all failure modes. |
//!
//! Logging goes through `tracing`; the library never installs a subscriber.

pub mod bundle;
pub mod config;
pub mod env;
pub mod error;
pub mod hook;
pub mod mount;
pub mod provision;
pub mod request;
pub mod state;
pub mod util;

pub use bundle::BundleConfig;
pub use config::{DEFAULT_CONFIG_PATH, HookConfig};
pub use error::HookError;
pub use hook::{Hook, Outcome};
pub use mount::{Mounter, SyscallMounter};
pub use provision::{CommandRunner, ProcessRunner};
pub use request::MountRequest;
pub use state::ContainerState;
