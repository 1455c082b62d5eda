use flate2::write::DeflateEncoder;
use std::io::Write;
use std::time::SystemTime;

use crate::error::{Result, invalid};

use super::structures::*;

/// Builds a ZIP archive in memory.
///
/// Entries are laid out as they are added; the central directory is appended
/// by [`finish`](Self::finish).
pub struct ZipWriter {
    buf: Vec<u8>,
    entries: Vec<ZipFileEntry>,
    method: CompressionMethod,
    mod_time: u16,
    mod_date: u16,
}

impl ZipWriter {
    pub fn new(method: CompressionMethod) -> Self {
        let (mod_time, mod_date) = dos_date_time(SystemTime::now());
        Self {
            buf: Vec::new(),
            entries: Vec::new(),
            method,
            mod_time,
            mod_date,
        }
    }

    /// Append one entry. Names ending in `/` become directory entries.
    pub fn add(&mut self, name: &str, content: &[u8]) -> Result<()> {
        let is_directory = name.ends_with('/');

        let (method, data) = if is_directory {
            (CompressionMethod::Stored, Vec::new())
        } else if self.method == CompressionMethod::Deflate {
            let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(content)?;
            (CompressionMethod::Deflate, encoder.finish()?)
        } else {
            (CompressionMethod::Stored, content.to_vec())
        };

        let entry = ZipFileEntry {
            file_name: name.to_string(),
            compression_method: method,
            compressed_size: data.len() as u64,
            uncompressed_size: if is_directory { 0 } else { content.len() as u64 },
            crc32: if is_directory { 0 } else { crc32fast::hash(content) },
            lfh_offset: self.buf.len() as u64,
            last_mod_time: self.mod_time,
            last_mod_date: self.mod_date,
            is_directory,
        };

        entry.write_local_header(&mut self.buf)?;
        self.buf.extend_from_slice(&data);
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append the central directory and return the finished archive bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let cd_offset = self.buf.len() as u64;
        for entry in &self.entries {
            entry.write_central_header(&mut self.buf)?;
        }
        let cd_size = self.buf.len() as u64 - cd_offset;

        let Ok(count) = u16::try_from(self.entries.len()) else {
            invalid!("too many entries ({}) without ZIP64", self.entries.len());
        };
        EndOfCentralDirectory::new(count, narrow(cd_size)?, narrow(cd_offset)?)
            .write_to(&mut self.buf)?;

        Ok(self.buf)
    }
}
