//! Scratch bundles and fake capabilities for pipeline tests.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use libmountpoint::{CommandRunner, ContainerState, HookConfig, Mounter};
use serde_json::Value;
use tempfile::TempDir;

pub const FIXTURE_CONFIG: &str = include_str!("../fixtures/config.json");
pub const FIXTURE_HOOK_CONFIG: &str = include_str!("../fixtures/hookconfig.json");
pub const FIXTURE_STATE: &str = include_str!("../fixtures/state.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
}

/// Records helper invocations and exits with a fixed code.
#[derive(Default)]
pub struct FakeRunner {
    pub exit_code: i32,
    pub calls: RefCell<Vec<Invocation>>,
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        program: &Path,
        args: &[OsString],
        env: &[(String, String)],
    ) -> io::Result<ExitStatus> {
        self.calls.borrow_mut().push(Invocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
            env: env.to_vec(),
        });
        Ok(ExitStatus::from_raw(self.exit_code << 8))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountCall {
    pub source: PathBuf,
    pub target: PathBuf,
    pub fstype: String,
    pub options: String,
}

/// Records mount calls; fails them with `fail_with` when set.
#[derive(Default)]
pub struct FakeMounter {
    pub fail_with: Option<i32>,
    pub calls: RefCell<Vec<MountCall>>,
}

impl Mounter for FakeMounter {
    fn mount(&self, source: &Path, target: &Path, fstype: &str, options: &str) -> io::Result<()> {
        self.calls.borrow_mut().push(MountCall {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            fstype: fstype.to_owned(),
            options: options.to_owned(),
        });
        match self.fail_with {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }
}

/// A temporary bundle directory with `rootfs/` and a `config.json` built from
/// the fixture with `process.env` replaced.
pub struct TestBundle {
    pub dir: TempDir,
}

impl TestBundle {
    pub fn new(env: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("bundle/rootfs")).expect("create rootfs");

        let mut config: Value = serde_json::from_str(FIXTURE_CONFIG).expect("fixture config");
        config["process"]["env"] = env.iter().map(|e| Value::from(*e)).collect();
        std::fs::write(
            dir.path().join("bundle/config.json"),
            serde_json::to_string_pretty(&config).expect("serialize"),
        )
        .expect("write config.json");

        Self { dir }
    }

    pub fn bundle(&self) -> PathBuf {
        self.dir.path().join("bundle")
    }

    pub fn config_path(&self) -> PathBuf {
        self.bundle().join("config.json")
    }

    pub fn host_mountpoint(&self) -> PathBuf {
        self.dir.path().join("host/mnt")
    }

    /// The state fixture pointed at this bundle.
    pub fn state(&self) -> ContainerState {
        let mut state: ContainerState =
            serde_json::from_str(FIXTURE_STATE).expect("fixture state");
        state.bundle = self.bundle();
        state
    }

    /// The hook config fixture with the host mount point moved into the
    /// scratch directory.
    pub fn hook_config(&self) -> HookConfig {
        let mut config: HookConfig =
            serde_json::from_str(FIXTURE_HOOK_CONFIG).expect("fixture hook config");
        config.host_mountpoint = self.host_mountpoint();
        config
    }
}
