//! Minimal ZIP codec backing the archive [`Source`](crate::store::Source)
//! and [`Target`](crate::store::Target).
//!
//! - [`structures`]: on-disk records (EOCD, ZIP64 records, file headers)
//! - [`parser`]: Central Directory parsing over a [`ReadAt`](crate::io::ReadAt) source
//! - [`reader`]: entry decompression with CRC verification
//! - [`writer`]: in-memory archive builder
//!
//! ## Supported Features
//!
//! - STORED and DEFLATE entries, read and write
//! - ZIP64 on read only
//! - Trailing archive comments on read
//!
//! No encryption and no multi-disk archives. Badly damaged archives are left
//! to the external `zip -FF` / `unzip` tools; this codec only has to handle
//! archives that are already well formed.

mod parser;
mod reader;
mod structures;
mod writer;

pub use parser::ZipParser;
pub use reader::ZipReader;
pub use structures::*;
pub use writer::ZipWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::LocalFileReader;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn roundtrip(method: CompressionMethod) -> Vec<(String, Vec<u8>)> {
        let mut writer = ZipWriter::new(method);
        writer.add("META-INF/", b"").unwrap();
        writer
            .add("content.xml", "<xmap-content>日本語</xmap-content>".as_bytes())
            .unwrap();
        writer.add("empty.txt", b"").unwrap();
        assert_eq!(writer.len(), 3);
        let bytes = writer.finish().unwrap();

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.zip");
        std::fs::write(&path, &bytes).unwrap();

        let reader = ZipReader::new(Arc::new(LocalFileReader::new(&path).unwrap()));
        let mut out = Vec::new();
        for entry in reader.list_files().await.unwrap() {
            let data = reader.read_to_memory(&entry).await.unwrap();
            out.push((entry.file_name, data));
        }
        out
    }

    #[tokio::test]
    async fn test_stored_and_deflated_archives_read_back() {
        for method in [CompressionMethod::Stored, CompressionMethod::Deflate] {
            let entries = roundtrip(method).await;
            let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, ["META-INF/", "content.xml", "empty.txt"]);
            assert_eq!(
                entries[1].1,
                "<xmap-content>日本語</xmap-content>".as_bytes()
            );
            assert!(entries[0].1.is_empty());
            assert!(entries[2].1.is_empty());
        }
    }

    #[tokio::test]
    async fn test_eocd_found_behind_comment() {
        let mut writer = ZipWriter::new(CompressionMethod::Stored);
        writer.add("a.txt", b"hello").unwrap();
        let mut bytes = writer.finish().unwrap();

        // Patch in a trailing comment
        let comment = b"saved by some tool";
        let len = bytes.len();
        bytes[len - 2..].copy_from_slice(&(comment.len() as u16).to_le_bytes());
        bytes.extend_from_slice(comment);

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("c.zip");
        std::fs::write(&path, &bytes).unwrap();

        let reader = ZipReader::new(Arc::new(LocalFileReader::new(&path).unwrap()));
        let entries = reader.list_files().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(reader.read_to_memory(&entries[0]).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_garbage_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("junk.zip");
        std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

        let reader = ZipReader::new(Arc::new(LocalFileReader::new(&path).unwrap()));
        let err = reader.list_files().await.unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArchive(_)));
    }

    #[tokio::test]
    async fn test_crc_mismatch_detected() {
        let mut writer = ZipWriter::new(CompressionMethod::Stored);
        writer.add("a.txt", b"hello").unwrap();
        let mut bytes = writer.finish().unwrap();

        // First data byte sits right after the 30-byte header and 5-byte name
        bytes[LFH_SIZE + 5] = b'j';

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.zip");
        std::fs::write(&path, &bytes).unwrap();

        let reader = ZipReader::new(Arc::new(LocalFileReader::new(&path).unwrap()));
        let entries = reader.list_files().await.unwrap();
        let err = reader.read_to_memory(&entries[0]).await.unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArchive(_)));
    }
}
