//! `mountpoint_hook`: OCI runtime hook that mounts an object storage bucket
//! into a container.
//!
//! The runtime runs the hook with the container state on stdin. Failures
//! while handling the container are logged and the hook still exits 0, so a
//! broken hook never blocks container startup. Only an unreadable hook
//! config is fatal.

use std::fs::OpenOptions;
use std::io::{self, BufReader, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use libmountpoint::util::clean_path;
use libmountpoint::{
    ContainerState, DEFAULT_CONFIG_PATH, Hook, HookConfig, HookError, Outcome, ProcessRunner,
    SyscallMounter,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const LOG_DIR_PREFIX: &str = "mountpoint_hook_log";
const LOG_FILE_NAME: &str = "mountpoint_hook.log";

#[derive(Parser, Debug)]
#[command(
    name = "mountpoint_hook",
    about = "OCI hook for mountpoint",
    disable_version_flag = true
)]
struct Cli {
    /// Path to the hook config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
    /// Path to the log file. Defaults to a file in a fresh temp directory
    #[arg(short, long)]
    log: Option<PathBuf>,
    /// Print the version
    #[arg(short = 'v', long)]
    version: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("mountpoint oci hook version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (writer, log_path) = log_writer(cli.log.as_deref());
    let filter = EnvFilter::new(if cli.debug { "debug" } else { "info" });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        match &log_path {
            Some(path) => info!(path = %path.display(), "logging to file"),
            None => warn!("unable to open a log file, logging to stderr"),
        }
        run(&cli, BufReader::new(io::stdin().lock())).inspect_err(|e| error!("{e:#}"))
    })
}

/// Load the hook config (fatal on failure), then handle the container whose
/// state is read from `state`. Pipeline failures are logged, not returned.
fn run<R: Read>(cli: &Cli, state: R) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "started mountpoint oci hook");

    let config = HookConfig::load(&cli.config)
        .with_context(|| format!("failed to load hook config {}", cli.config.display()))?;
    info!(activation_flag = %config.activation_flag, "hook config loaded");

    let hook = Hook::system(config);
    match handle_container(&hook, state) {
        Ok(Outcome::Inactive) => info!("hook inactive for this container"),
        Ok(Outcome::Declined { .. }) => info!("hook activation declined"),
        Ok(Outcome::Mounted { target }) => info!(target = %target.display(), "hook done"),
        // The container must start regardless.
        Err(e) => error!(error = %e, "hook failed, container start continues"),
    }
    Ok(())
}

fn handle_container<R: Read>(
    hook: &Hook<ProcessRunner, SyscallMounter>,
    state: R,
) -> Result<Outcome, HookError> {
    let state = ContainerState::from_reader(state)?;
    hook.run(&state)
}

/// Pick the log destination: the requested file, else a file in a new temp
/// directory, else stderr. Returns the file path when one was opened.
fn log_writer(requested: Option<&Path>) -> (BoxMakeWriter, Option<PathBuf>) {
    let path = match requested {
        Some(path) => Some(clean_path(path)),
        None => tempfile::Builder::new()
            .prefix(LOG_DIR_PREFIX)
            .tempdir()
            .ok()
            .map(|dir| dir.keep().join(LOG_FILE_NAME)),
    };

    let opened = path.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(&path)
            .ok()
            .map(|file| (file, path))
    });

    match opened {
        Some((file, path)) => (BoxMakeWriter::new(Mutex::new(file)), Some(path)),
        None => (BoxMakeWriter::new(io::stderr), None),
    }
}
