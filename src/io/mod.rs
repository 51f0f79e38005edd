mod http;
mod local;

pub use http::{Download, HttpDownloader};
pub use local::{LocalFileReader, MemoryReader};

use anyhow::Result;
use async_trait::async_trait;

/// Trait for random access reading from an archive source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Fill `buf` from `offset`; short reads are only allowed at end of data
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
