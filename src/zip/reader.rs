use flate2::read::DeflateDecoder;
use std::io::Read;
use std::sync::Arc;

use crate::error::{Result, invalid};
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Reads entries out of a ZIP archive
pub struct ZipReader<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipReader<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in central directory order
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Decompress one entry into memory, checking its CRC-32
    pub async fn read_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_directory {
            return Ok(Vec::new());
        }

        let data_offset = self.parser.get_data_offset(entry).await?;
        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
                out
            }
            CompressionMethod::Unknown(method) => {
                invalid!(
                    "unsupported compression method {} for '{}'",
                    method,
                    entry.file_name
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            invalid!(
                "'{}' expanded to {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            );
        }
        if crc32fast::hash(&data) != entry.crc32 {
            invalid!("CRC mismatch for '{}'", entry.file_name);
        }

        Ok(data)
    }
}
