//! Path and directory helpers shared by the pipeline stages.

use std::fs::DirBuilder;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Component, Path, PathBuf};

/// Mode for every directory the hook creates: owner rwx only.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Lexically normalize `path`: drop `.` components, fold `name/..` pairs and
/// discard `..` directly under the root. The filesystem is never consulted,
/// so symlinks are left alone.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Join `path` below `root` so that the result never leaves `root`.
///
/// `path` is interpreted as if `root` were `/`: a leading slash is ignored and
/// `..` cannot climb above it.
pub fn join_under(root: &Path, path: &Path) -> PathBuf {
    let rooted = clean_path(&Path::new("/").join(path));
    let relative = rooted.strip_prefix("/").unwrap_or(&rooted);
    clean_path(&root.join(relative))
}

/// Resolve symlinks in the part of `path` that exists and append the
/// missing tail unchanged.
///
/// `path` is expected to be clean (see [`clean_path`]). A dangling symlink
/// is an error.
pub fn resolve_existing(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        match existing.symlink_metadata() {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        tail.push(name);
                        existing = parent;
                    }
                    _ => break,
                }
            }
            Err(e) => return Err(e),
        }
    }

    let mut resolved = existing.canonicalize()?;
    resolved.extend(tail.iter().rev());
    Ok(resolved)
}

/// Whether `path` still lies under `root` once symlinks are followed.
pub fn resolves_within(root: &Path, path: &Path) -> io::Result<bool> {
    Ok(resolve_existing(path)?.starts_with(resolve_existing(root)?))
}

/// Create `path` and any missing parents with [`PRIVATE_DIR_MODE`].
///
/// An already existing directory is not an error.
pub fn create_private_dir(path: &Path) -> io::Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(PRIVATE_DIR_MODE)
        .create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn clean_path_normalizes() {
        let cases = [
            ("/var/lib//bundle/./config.json", "/var/lib/bundle/config.json"),
            ("/var/lib/bundle/../other", "/var/lib/other"),
            ("/../etc", "/etc"),
            ("a/b/../../..", ".."),
            ("./", "."),
            ("", "."),
        ];
        for (input, want) in cases {
            assert_eq!(clean_path(Path::new(input)), PathBuf::from(want), "{input}");
        }
    }

    #[test]
    fn join_under_stays_inside_root() {
        let root = Path::new("/bundle/rootfs");
        assert_eq!(
            join_under(root, Path::new("/mnt/s3")),
            PathBuf::from("/bundle/rootfs/mnt/s3")
        );
        assert_eq!(
            join_under(root, Path::new("mnt/s3")),
            PathBuf::from("/bundle/rootfs/mnt/s3")
        );
        assert_eq!(
            join_under(root, Path::new("../../../etc")),
            PathBuf::from("/bundle/rootfs/etc")
        );
        assert_eq!(join_under(root, Path::new("")), PathBuf::from(root));
    }

    #[test]
    fn resolve_existing_follows_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().canonicalize().unwrap();
        std::fs::create_dir_all(base.join("rootfs/real")).unwrap();
        std::fs::create_dir(base.join("outside")).unwrap();
        std::os::unix::fs::symlink(base.join("outside"), base.join("rootfs/evil")).unwrap();
        std::os::unix::fs::symlink("real", base.join("rootfs/inner")).unwrap();

        assert_eq!(
            resolve_existing(&base.join("rootfs/evil/x/y")).unwrap(),
            base.join("outside/x/y")
        );
        assert_eq!(
            resolve_existing(&base.join("rootfs/missing/x")).unwrap(),
            base.join("rootfs/missing/x")
        );

        let root = base.join("rootfs");
        assert!(resolves_within(&root, &root.join("mnt/s3")).unwrap());
        assert!(resolves_within(&root, &root.join("inner/x")).unwrap());
        assert!(!resolves_within(&root, &root.join("evil/x")).unwrap());
    }

    #[test]
    fn resolve_existing_rejects_dangling_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("link")).unwrap();
        assert!(resolve_existing(&tmp.path().join("link/x")).is_err());
    }

    #[test]
    fn create_private_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a/b/c");

        create_private_dir(&dir).unwrap();
        create_private_dir(&dir).unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "group/world bits must be clear");
    }

    #[test]
    fn create_private_dir_fails_on_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(create_private_dir(&file.join("sub")).is_err());
    }
}
