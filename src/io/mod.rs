mod local;

pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::Result;

/// Random access to the bytes of an archive
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read up to `buf.len()` bytes starting at `offset`
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Total size of the underlying data
    fn size(&self) -> u64;

    /// Fill `buf` completely or fail with `UnexpectedEof`
    async fn read_exact_at(&self, mut offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            filled += n;
            offset += n as u64;
        }
        Ok(())
    }
}
