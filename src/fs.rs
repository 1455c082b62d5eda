//! Filesystem helpers used for staging and cleanup.
//!
//! These are synchronous on purpose: cleanup also runs from `Drop`, where
//! nothing can be awaited.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// Create `path` and all missing parents.
///
/// Fails if `path` (or one of its parents) exists but is not a directory.
pub fn mkdirs(path: &Path) -> io::Result<()> {
    debug!(path = %path.display(), "making dirs");
    if path.is_dir() {
        return Ok(());
    }
    if lexists(path) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("not a directory: {}", path.display()),
        ));
    }
    fs::create_dir_all(path)
}

/// Remove a file, symlink or directory tree. A missing path is not an error.
///
/// Symbolic links are removed themselves, never followed.
pub fn rmall(path: &Path) -> io::Result<()> {
    debug!(path = %path.display(), "deleting");
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Like `Path::exists`, but true for dangling symlinks as well.
pub fn lexists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mkdirs_nested() {
        let tmp = TempDir::new().unwrap();
        let deep = tmp.path().join("a/b/c");

        mkdirs(&deep).unwrap();
        assert!(deep.is_dir());

        // Second call is a no-op
        mkdirs(&deep).unwrap();
    }

    #[test]
    fn test_mkdirs_over_file_fails() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"x").unwrap();

        assert!(mkdirs(&file).is_err());
        assert!(mkdirs(&file.join("child")).is_err());
    }

    #[test]
    fn test_rmall_tree_and_missing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("tree");
        mkdirs(&root.join("x/y")).unwrap();
        fs::write(root.join("x/y/file.xml"), b"<a/>").unwrap();

        rmall(&root).unwrap();
        assert!(!lexists(&root));

        rmall(&root).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_rmall_does_not_follow_symlinks() {
        let tmp = TempDir::new().unwrap();
        let outside = tmp.path().join("outside");
        mkdirs(&outside).unwrap();
        fs::write(outside.join("keep.txt"), b"keep").unwrap();

        let root = tmp.path().join("root");
        mkdirs(&root).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();
        // Cycle back to the root itself
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();

        rmall(&root).unwrap();
        assert!(!lexists(&root));
        assert!(outside.join("keep.txt").exists());
    }
}
