//! Host-side mount provisioning through the external mount helper.
//!
//! The helper is invoked as
//!
//! ```text
//! <program_path> <bucket> <host_mountpoint> [--endpoint-url <url>] [--prefix <prefix>]
//! ```
//!
//! with the container's own environment, so it sees the container's S3
//! credentials and settings rather than the hook's. The invocation is single
//! shot: a failed or partially completed external mount is never retried.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, error, info};

use crate::config::HookConfig;
use crate::env;
use crate::error::HookError;
use crate::request::MountRequest;
use crate::util::create_private_dir;

pub const ENDPOINT_URL_FLAG: &str = "--endpoint-url";
pub const PREFIX_FLAG: &str = "--prefix";

/// Capability to run a program to completion.
pub trait CommandRunner {
    /// Run `program` with `args` and exactly the variables in `env`, and
    /// block until it exits.
    fn run(
        &self,
        program: &Path,
        args: &[OsString],
        env: &[(String, String)],
    ) -> io::Result<ExitStatus>;
}

/// Runs programs as real child processes.
///
/// Stdio is detached: helpers such as mount-s3 leave a daemon behind that
/// would otherwise hold our pipes open and block the wait forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        program: &Path,
        args: &[OsString],
        env: &[(String, String)],
    ) -> io::Result<ExitStatus> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .env_clear()
            .envs(env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        debug!(
            program = %program.display(),
            ?args,
            env_len = env.len(),
            "spawning mount helper",
        );
        cmd.status()
    }
}

/// Helper arguments for `request`: bucket and host mount point first, then
/// the endpoint flag, then the prefix flag.
pub fn helper_args(request: &MountRequest, config: &HookConfig) -> Vec<OsString> {
    let mut args = vec![
        OsString::from(&request.s3_bucket_name),
        config.host_mountpoint.clone().into_os_string(),
    ];

    if !request.s3_endpoint_url.is_empty() {
        args.push(ENDPOINT_URL_FLAG.into());
        args.push(OsString::from(&request.s3_endpoint_url));
    }
    if !request.s3_prefix.is_empty() {
        args.push(PREFIX_FLAG.into());
        args.push(OsString::from(&request.s3_prefix));
    }
    args
}

/// Mount the requested bucket on [`HookConfig::host_mountpoint`].
///
/// Nothing is touched when the bucket name is empty. Otherwise the host mount
/// point is created (owner-only) and the helper runs with the container
/// environment `env`.
pub fn provision<R, S>(
    runner: &R,
    env: &[S],
    request: &MountRequest,
    config: &HookConfig,
) -> Result<(), HookError>
where
    R: CommandRunner + ?Sized,
    S: AsRef<str>,
{
    if request.s3_bucket_name.is_empty() {
        error!("S3 bucket name is empty");
        return Err(HookError::InvalidRequest("S3 bucket name is empty".into()));
    }

    create_private_dir(&config.host_mountpoint).map_err(|source| {
        error!(
            path = %config.host_mountpoint.display(),
            error = %source,
            "unable to create host mount point directory",
        );
        HookError::DirectoryCreate {
            path: config.host_mountpoint.clone(),
            source,
        }
    })?;

    let args = helper_args(request, config);
    let program = &config.program_path;
    info!(program = %program.display(), ?args, "executing mount helper");

    let status = runner
        .run(program, &args, &env::command_env(env))
        .map_err(|e| HookError::MountHelperExecution {
            program: program.clone(),
            reason: e.to_string(),
        })?;

    if !status.success() {
        error!(program = %program.display(), %status, "mount helper failed");
        return Err(HookError::MountHelperExecution {
            program: program.clone(),
            reason: status.to_string(),
        });
    }

    info!(
        bucket = %request.s3_bucket_name,
        mountpoint = %config.host_mountpoint.display(),
        "bucket mounted on host",
    );
    Ok(())
}
