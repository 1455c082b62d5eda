use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fs::mkdirs;

use super::{Entries, Source, Target, is_directory};

/// Map an entry name onto a path under `root`, refusing names that escape it.
fn resolve(root: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("entry name escapes the directory: {}", name),
        )
        .into());
    }
    Ok(root.join(relative))
}

/// [`Source`] over a directory tree.
///
/// Walks in file-name order and never follows symbolic links; links are
/// skipped entirely. Files and directories whose names are not valid UTF-8
/// cannot be named as entries and are skipped along with their contents.
pub struct DirectorySource {
    root: PathBuf,
    open: bool,
}

impl DirectorySource {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open: true,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::Usage("directory source"))
        }
    }
}

#[async_trait]
impl Source for DirectorySource {
    fn entries(&self) -> Result<Entries<'_>> {
        self.check_open()?;
        let root = self.root.as_path();

        let walk = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || entry.file_name().to_str().is_some() {
                    return true;
                }
                warn!(path = %entry.path().display(), "skipping non UTF-8 name");
                false
            })
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(Error::from(e))),
                };
                if entry.path_is_symlink() {
                    warn!(path = %entry.path().display(), "skipping symbolic link");
                    return None;
                }

                let relative = entry.path().strip_prefix(root).ok()?;
                let mut name = relative
                    .components()
                    .map(|c| c.as_os_str().to_str())
                    .collect::<Option<Vec<_>>>()?
                    .join("/");
                if entry.file_type().is_dir() {
                    name.push('/');
                }
                Some(Ok(name))
            });

        Ok(Box::new(walk))
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.check_open()?;
        if is_directory(name) {
            return Ok(Vec::new());
        }
        Ok(tokio::fs::read(resolve(&self.root, name)?).await?)
    }

    async fn entry_size(&self, name: &str) -> Result<u64> {
        self.check_open()?;
        let metadata = tokio::fs::symlink_metadata(resolve(&self.root, name)?).await?;
        Ok(metadata.len())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// [`Target`] populating a directory tree.
///
/// Every write goes straight to disk, so finishing only ends the scope.
pub struct DirectoryTarget {
    root: PathBuf,
    open: bool,
}

impl DirectoryTarget {
    /// Create `root` (and its parents) if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        mkdirs(&root)?;
        Ok(Self { root, open: true })
    }
}

#[async_trait]
impl Target for DirectoryTarget {
    async fn write(&mut self, name: &str, content: &[u8]) -> Result<()> {
        if !self.open {
            return Err(Error::Usage("directory target"));
        }

        let path = resolve(&self.root, name)?;
        if is_directory(name) {
            mkdirs(&path)?;
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            mkdirs(parent)?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::Usage("directory target"));
        }
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(source: &DirectorySource) -> Vec<String> {
        source.entries().unwrap().map(|e| e.unwrap()).collect()
    }

    #[tokio::test]
    async fn test_entries_directories_first() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("Revisions/sheet1")).unwrap();
        fs::write(root.join("Revisions/sheet1/rev-1-1.xml"), b"<r/>").unwrap();
        fs::write(root.join("content.xml"), b"<c/>").unwrap();
        fs::create_dir(root.join("Thumbnails")).unwrap();

        let source = DirectorySource::open(root);
        assert_eq!(
            names(&source),
            [
                "Revisions/",
                "Revisions/sheet1/",
                "Revisions/sheet1/rev-1-1.xml",
                "Thumbnails/",
                "content.xml",
            ]
        );

        // Restartable
        assert_eq!(names(&source).len(), 5);

        assert_eq!(source.read("content.xml").await.unwrap(), b"<c/>");
        assert!(source.read("Revisions/").await.unwrap().is_empty());
        assert_eq!(
            source
                .entry_size("Revisions/sheet1/rev-1-1.xml")
                .await
                .unwrap(),
            4
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.xml"), b"<a/>").unwrap();
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();

        let source = DirectorySource::open(&root);
        assert_eq!(names(&source), ["a.xml"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        // GBK bytes for "中文"
        let gbk = OsStr::from_bytes(b"\xd6\xd0\xce\xc4");
        fs::create_dir_all(root.join("attachments").join(gbk)).unwrap();
        fs::write(root.join("attachments").join(gbk).join("inner.png"), b"png").unwrap();
        fs::write(root.join("attachments/ok.png"), b"png").unwrap();
        fs::write(root.join("attachments").join(Path::new(gbk).with_extension("png")), b"png")
            .unwrap();
        fs::write(root.join("content.xml"), b"<c/>").unwrap();

        let source = DirectorySource::open(root);
        let listed = names(&source);
        assert_eq!(listed, ["attachments/", "attachments/ok.png", "content.xml"]);
        for name in &listed {
            source.entry_size(name).await.unwrap();
            source.read(name).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_target_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let mut target = DirectoryTarget::create(tmp.path().join("out")).unwrap();

        target
            .write("META-INF/manifest.xml", b"<manifest/>")
            .await
            .unwrap();
        target.write("Thumbnails/", b"").await.unwrap();
        target.finish().await.unwrap();

        let root = tmp.path().join("out");
        assert_eq!(
            fs::read(root.join("META-INF/manifest.xml")).unwrap(),
            b"<manifest/>"
        );
        assert!(root.join("Thumbnails").is_dir());

        assert!(matches!(
            target.write("late.xml", b"").await,
            Err(Error::Usage(_))
        ));
    }

    #[tokio::test]
    async fn test_target_rejects_escaping_names() {
        let tmp = TempDir::new().unwrap();
        let mut target = DirectoryTarget::create(tmp.path().join("out")).unwrap();
        assert!(target.write("../evil.xml", b"x").await.is_err());
        assert!(!tmp.path().join("evil.xml").exists());
    }

    #[tokio::test]
    async fn test_target_fails_when_parent_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        assert!(DirectoryTarget::create(&blocker).is_err());

        let mut target = DirectoryTarget::create(tmp.path()).unwrap();
        assert!(matches!(
            target.write("blocker/child.xml", b"x").await,
            Err(Error::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_source_is_usage_error() {
        let tmp = TempDir::new().unwrap();
        let mut source = DirectorySource::open(tmp.path());
        source.close();
        assert!(matches!(source.entries(), Err(Error::Usage(_))));
        assert!(matches!(source.read("x").await, Err(Error::Usage(_))));
    }
}
