//! Bind-mounting the host mount point into the container rootfs.
//!
//! Mount options use the familiar comma separated `mount(8)` form
//! (`"bind,rw"`). [`MountOptions`] splits such a string into kernel flags and
//! the leftover filesystem data, which is what [`SyscallMounter`] hands to
//! `mount(2)`.

use std::io;
use std::path::Path;

use nix::mount::MsFlags;
use tracing::{debug, error, info};

use crate::error::HookError;
use crate::util::create_private_dir;

/// Filesystem type passed along with bind mounts; the kernel ignores it.
pub const BIND_FS_TYPE: &str = "none";

/// Options for the container bind mount: read-write, no recursion or
/// propagation changes.
pub const BIND_MOUNT_OPTIONS: [&str; 2] = ["bind", "rw"];

/// Capability to perform a kernel mount.
pub trait Mounter {
    /// Mount `source` on `target`. `options` is a comma separated
    /// `mount(8)` option string.
    fn mount(&self, source: &Path, target: &Path, fstype: &str, options: &str) -> io::Result<()>;
}

/// Performs real `mount(2)` calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyscallMounter;

impl Mounter for SyscallMounter {
    fn mount(&self, source: &Path, target: &Path, fstype: &str, options: &str) -> io::Result<()> {
        let opts = MountOptions::parse(options);
        let data = opts.data();
        let data = (!data.is_empty()).then_some(data.as_str());

        nix::mount::mount(Some(source), target, Some(fstype), opts.flags, data)?;

        // The kernel ignores MS_RDONLY on the initial bind; it only sticks on
        // a remount.
        if opts.flags.contains(MsFlags::MS_BIND) && opts.flags.contains(MsFlags::MS_RDONLY) {
            nix::mount::mount(
                None::<&str>,
                target,
                None::<&str>,
                opts.flags | MsFlags::MS_REMOUNT,
                None::<&str>,
            )?;
        }
        Ok(())
    }
}

/// A parsed mount option string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    pub flags: MsFlags,
    /// Options that are not kernel flags, in their original order.
    pub extra: Vec<String>,
}

impl MountOptions {
    /// Parse a comma separated option string. Later options override
    /// earlier ones (`"ro,rw"` is read-write). Empty segments are ignored.
    pub fn parse(options: &str) -> Self {
        let mut flags = MsFlags::empty();
        let mut extra = Vec::new();

        for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            match flag_for(option) {
                Some((true, flag)) => flags &= !flag,
                Some((false, flag)) => flags |= flag,
                None => extra.push(option.to_owned()),
            }
        }
        Self { flags, extra }
    }

    /// Filesystem-specific data for `mount(2)`.
    pub fn data(&self) -> String {
        join_options(&self.extra)
    }
}

/// Join options into the comma separated form. An empty list yields `""`.
pub fn join_options<S: AsRef<str>>(options: &[S]) -> String {
    options
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

/// Map an option to `(clear, flag)`.
fn flag_for(option: &str) -> Option<(bool, MsFlags)> {
    let entry = match option {
        "defaults" => (false, MsFlags::empty()),
        "ro" => (false, MsFlags::MS_RDONLY),
        "rw" => (true, MsFlags::MS_RDONLY),
        "suid" => (true, MsFlags::MS_NOSUID),
        "nosuid" => (false, MsFlags::MS_NOSUID),
        "dev" => (true, MsFlags::MS_NODEV),
        "nodev" => (false, MsFlags::MS_NODEV),
        "exec" => (true, MsFlags::MS_NOEXEC),
        "noexec" => (false, MsFlags::MS_NOEXEC),
        "sync" => (false, MsFlags::MS_SYNCHRONOUS),
        "async" => (true, MsFlags::MS_SYNCHRONOUS),
        "dirsync" => (false, MsFlags::MS_DIRSYNC),
        "remount" => (false, MsFlags::MS_REMOUNT),
        "mand" => (false, MsFlags::MS_MANDLOCK),
        "nomand" => (true, MsFlags::MS_MANDLOCK),
        "atime" => (true, MsFlags::MS_NOATIME),
        "noatime" => (false, MsFlags::MS_NOATIME),
        "diratime" => (true, MsFlags::MS_NODIRATIME),
        "nodiratime" => (false, MsFlags::MS_NODIRATIME),
        "relatime" => (false, MsFlags::MS_RELATIME),
        "norelatime" => (true, MsFlags::MS_RELATIME),
        "strictatime" => (false, MsFlags::MS_STRICTATIME),
        "nostrictatime" => (true, MsFlags::MS_STRICTATIME),
        "bind" => (false, MsFlags::MS_BIND),
        "rbind" => (false, MsFlags::MS_BIND | MsFlags::MS_REC),
        _ => return None,
    };
    Some(entry)
}

/// Make `host` visible read-write at `target`.
///
/// `target` and its parents are created owner-only if missing. The mount is
/// not undone if a later step fails.
pub fn bind_mount<M: Mounter + ?Sized>(
    mounter: &M,
    host: &Path,
    target: &Path,
) -> Result<(), HookError> {
    info!(
        src = %host.display(),
        dst = %target.display(),
        "bind mounting host mount point into container",
    );

    create_private_dir(target).map_err(|source| {
        error!(path = %target.display(), error = %source, "unable to create container mount point");
        HookError::DirectoryCreate {
            path: target.to_path_buf(),
            source,
        }
    })?;

    let options = join_options(&BIND_MOUNT_OPTIONS);
    debug!(fstype = BIND_FS_TYPE, %options, "mount options");

    mounter
        .mount(host, target, BIND_FS_TYPE, &options)
        .map_err(|source| {
            error!(
                src = %host.display(),
                dst = %target.display(),
                error = %source,
                "bind mount failed",
            );
            HookError::BindMount {
                src: host.to_path_buf(),
                target: target.to_path_buf(),
                source,
            }
        })
}
