use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Compression;
use crate::error::{Error, Result};
use crate::io::LocalFileReader;
use crate::zip::{ZipFileEntry, ZipReader, ZipWriter};

use super::{Entries, Source, Target};

struct OpenArchive {
    reader: ZipReader<LocalFileReader>,
    entries: Vec<ZipFileEntry>,
    by_name: HashMap<String, usize>,
}

/// [`Source`] over a ZIP file
pub struct ArchiveSource {
    open: Option<OpenArchive>,
}

impl ArchiveSource {
    /// Open `path` and read its central directory.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let reader = ZipReader::new(Arc::new(LocalFileReader::new(&path)?));
        let entries = reader.list_files().await?;
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.file_name.clone(), i))
            .collect();

        Ok(Self {
            open: Some(OpenArchive {
                reader,
                entries,
                by_name,
            }),
        })
    }

    fn archive(&self) -> Result<&OpenArchive> {
        self.open.as_ref().ok_or(Error::Usage("archive source"))
    }

    fn lookup<'a>(archive: &'a OpenArchive, name: &str) -> Result<&'a ZipFileEntry> {
        archive
            .by_name
            .get(name)
            .map(|&i| &archive.entries[i])
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no entry named '{}'", name),
                )
                .into()
            })
    }
}

#[async_trait]
impl Source for ArchiveSource {
    fn entries(&self) -> Result<Entries<'_>> {
        let archive = self.archive()?;
        Ok(Box::new(
            archive.entries.iter().map(|e| Ok(e.file_name.clone())),
        ))
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let archive = self.archive()?;
        let entry = Self::lookup(archive, name)?;
        archive.reader.read_to_memory(entry).await
    }

    async fn entry_size(&self, name: &str) -> Result<u64> {
        let archive = self.archive()?;
        Ok(Self::lookup(archive, name)?.uncompressed_size)
    }

    fn close(&mut self) {
        self.open = None;
    }
}

/// [`Target`] building a new ZIP file.
///
/// Entries are staged in memory and the file is written by
/// [`finish`](Target::finish). Dropping an unfinished target writes nothing.
pub struct ArchiveTarget {
    path: PathBuf,
    writer: Option<ZipWriter>,
}

impl ArchiveTarget {
    pub fn create(path: impl Into<PathBuf>, compression: Compression) -> Self {
        Self {
            path: path.into(),
            writer: Some(ZipWriter::new(compression.into())),
        }
    }
}

#[async_trait]
impl Target for ArchiveTarget {
    async fn write(&mut self, name: &str, content: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::Usage("archive target"))?;
        writer.add(name, content)
    }

    async fn finish(&mut self) -> Result<()> {
        let writer = self.writer.take().ok_or(Error::Usage("archive target"))?;
        let bytes = writer.finish()?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}
