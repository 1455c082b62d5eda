//! Uniform access to "a ZIP archive" and "a directory tree".
//!
//! The repair stages read through [`Source`] and write through [`Target`] so
//! the same code works on an extracted directory and on an archive being
//! rebuilt. Entry names always use `/` as separator; directory entries end
//! with `/` and carry no content.
//!
//! Every source and target is opened explicitly and released by
//! [`Source::close`] / [`Target::finish`] (or by dropping it). Accessors
//! called after release fail with [`Error::Usage`](crate::Error::Usage).

mod archive;
mod directory;

pub use archive::{ArchiveSource, ArchiveTarget};
pub use directory::{DirectorySource, DirectoryTarget};

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;

/// Lazily produced entry names
pub type Entries<'a> = Box<dyn Iterator<Item = Result<String>> + Send + 'a>;

/// Read access to a set of entries
#[async_trait]
pub trait Source: Send + Sync {
    /// Entry names; each call starts a fresh pass.
    ///
    /// Directories come before their children.
    fn entries(&self) -> Result<Entries<'_>>;

    /// Raw content of one entry; empty for directory entries
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Uncompressed size of one entry in bytes
    async fn entry_size(&self, name: &str) -> Result<u64>;

    /// Release the underlying handle
    fn close(&mut self);
}

/// Write access to a set of entries
#[async_trait]
pub trait Target: Send {
    /// Add one entry. Names ending in `/` create a directory entry.
    async fn write(&mut self, name: &str, content: &[u8]) -> Result<()>;

    /// Flush everything written so far and release the target
    async fn finish(&mut self) -> Result<()>;
}

/// One entry: a name plus its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub content: Vec<u8>,
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        is_directory(&self.name)
    }
}

pub fn is_directory(name: &str) -> bool {
    name.ends_with('/')
}

/// Read every entry of `source`, in enumeration order.
pub async fn read_all(source: &dyn Source) -> Result<Vec<Entry>> {
    let mut out = Vec::new();
    for name in source.entries()? {
        let name = name?;
        let content = source.read(&name).await?;
        out.push(Entry { name, content });
    }
    Ok(out)
}

/// Copy every entry of `source` into `target`, preserving names exactly.
///
/// Returns the number of entries copied. The target is not finished.
pub async fn copy_all(source: &dyn Source, target: &mut dyn Target) -> Result<usize> {
    let mut count = 0;
    for name in source.entries()? {
        let name = name?;
        debug!(entry = %name, "archiving");
        let content = source.read(&name).await?;
        target.write(&name, &content).await?;
        count += 1;
    }
    Ok(count)
}
