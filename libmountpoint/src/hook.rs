//! The hook pipeline for one container lifecycle event.
//!
//! ```text
//! read config.json -> resolve -> inactive | declined
//!                             \-> provision -> bind mount -> write config.json -> mounted
//! ```
//!
//! The bind target is checked before anything is touched: it must lie below
//! the rootfs, also after following symlinks that already exist there.
//!
//! Nothing is rolled back: if the bind mount or the final write fails, the
//! helper's host mount stays in place and a retried invocation picks it up.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::bundle::BundleConfig;
use crate::config::HookConfig;
use crate::error::HookError;
use crate::mount::{self, Mounter, SyscallMounter};
use crate::provision::{self, CommandRunner, ProcessRunner};
use crate::request::MountRequest;
use crate::state::ContainerState;
use crate::util::{join_under, resolves_within};

/// How an invocation that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The container environment carries none of the recognized variables.
    Inactive,
    /// Variables are present but the activation flag is not `"true"`.
    Declined { activation_flag: String },
    /// The bucket is mounted and bind-mounted at `target`.
    Mounted { target: PathBuf },
}

/// Runs the pipeline with injected process and mount capabilities.
pub struct Hook<R, M> {
    config: HookConfig,
    runner: R,
    mounter: M,
}

impl Hook<ProcessRunner, SyscallMounter> {
    /// A hook that spawns real helper processes and issues real mounts.
    pub fn system(config: HookConfig) -> Self {
        Self::new(config, ProcessRunner, SyscallMounter)
    }
}

impl<R, M> Hook<R, M>
where
    R: CommandRunner,
    M: Mounter,
{
    pub fn new(config: HookConfig, runner: R, mounter: M) -> Self {
        Self {
            config,
            runner,
            mounter,
        }
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn mounter(&self) -> &M {
        &self.mounter
    }

    /// Handle the container described by `state`.
    #[instrument(skip_all, fields(id = %state.id, pid = state.pid))]
    pub fn run(&self, state: &ContainerState) -> Result<Outcome, HookError> {
        info!(
            status = %state.status,
            bundle = %state.bundle.display(),
            "handling container",
        );

        let config_path = state.config_path();
        let bundle_config = BundleConfig::read(&config_path)?;
        let env = bundle_config.env();
        debug!(?env, hook_config = ?self.config, "container environment");

        let request = MountRequest::resolve(env, &self.config);
        if request.is_empty() {
            info!("no mount requested by container environment");
            return Ok(Outcome::Inactive);
        }
        debug!(?request, "mount request resolved");

        if !request.is_activated() {
            info!(
                flag = %self.config.activation_flag,
                value = %request.activation_flag,
                "activation flag not set to true, skipping",
            );
            return Ok(Outcome::Declined {
                activation_flag: request.activation_flag,
            });
        }

        let rootfs = state.rootfs_path();
        let target = join_under(&rootfs, request.container_mountpoint(&self.config));
        check_target(&rootfs, &target)?;

        provision::provision(&self.runner, env, &request, &self.config)?;

        mount::bind_mount(&self.mounter, &self.config.host_mountpoint, &target)?;

        bundle_config.write(&config_path)?;

        info!(target = %target.display(), "mount ready");
        Ok(Outcome::Mounted { target })
    }
}

/// Reject a bind target that is the rootfs itself or that a symlink inside
/// the rootfs redirects elsewhere. Runs before anything is created.
fn check_target(rootfs: &Path, target: &Path) -> Result<(), HookError> {
    if target == rootfs {
        return Err(HookError::InvalidRequest(
            "container mount point is empty".into(),
        ));
    }

    match resolves_within(rootfs, target) {
        Ok(true) => Ok(()),
        Ok(false) => Err(HookError::InvalidRequest(format!(
            "container mount point {} resolves outside the rootfs",
            target.display()
        ))),
        Err(e) => Err(HookError::InvalidRequest(format!(
            "unable to resolve container mount point {}: {e}",
            target.display()
        ))),
    }
}
