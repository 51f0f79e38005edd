use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use flate2::Crc;
use flate2::read::DeflateDecoder;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound on the output buffer reserved before inflating
const MAX_PREALLOC: usize = 1 << 20;

/// Best compression ratio DEFLATE can reach (258-byte matches in ~2 bits)
const MAX_DEFLATE_RATIO: u64 = 1032;

/// Counts from a whole-archive extraction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    /// Encrypted entries or names escaping the target directory
    pub skipped: usize,
}

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Decompress an entry into memory, checking its size and CRC-32
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        check_declared_size(entry)?;
        let raw = self.parser.read_compressed(entry).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(raw.len().saturating_mul(4).min(MAX_PREALLOC));
                // One byte of slack so oversized output is detected rather than truncated
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size + 1)
                    .read_to_end(&mut out)
                    .with_context(|| format!("Corrupt deflate data in {}", entry.file_name))?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} for {}",
                    method,
                    entry.file_name
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("CRC-32 mismatch for {}", entry.file_name);
        }

        Ok(data)
    }

    /// Extract file to disk
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = self.extract_to_memory(entry).await?;

        let mut file = fs::File::create(output_path)
            .await
            .with_context(|| format!("Cannot create {}", output_path.display()))?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(())
    }

    /// Extract every entry beneath `target_dir`, overwriting existing files.
    ///
    /// Entries that are encrypted or whose names would escape `target_dir`
    /// are skipped with a warning. Any other failure aborts the extraction.
    pub async fn extract_all(&self, target_dir: &Path) -> Result<ExtractSummary> {
        let mut summary = ExtractSummary::default();

        for entry in self.list_files().await? {
            let Some(relative) = entry.enclosed_path() else {
                warn!("Skipping {:?}: path escapes target directory", entry.file_name);
                summary.skipped += 1;
                continue;
            };
            let output_path = target_dir.join(relative);

            if entry.is_directory {
                fs::create_dir_all(&output_path).await?;
                summary.directories += 1;
                continue;
            }

            if entry.is_encrypted() {
                warn!("Skipping {}: encrypted entries are not supported", entry.file_name);
                summary.skipped += 1;
                continue;
            }

            debug!("  extracting: {}", entry.file_name);
            self.extract_to_file(&entry, &output_path).await?;
            summary.files += 1;
        }

        Ok(summary)
    }
}

/// Rejects sizes no well-formed member could declare, before any buffer is
/// sized or any data is read.
fn check_declared_size(entry: &ZipFileEntry) -> Result<()> {
    let plausible = match entry.compression_method {
        CompressionMethod::Stored => entry.uncompressed_size == entry.compressed_size,
        CompressionMethod::Deflate => {
            entry.uncompressed_size <= entry.compressed_size.saturating_mul(MAX_DEFLATE_RATIO)
        }
        CompressionMethod::Unknown(_) => true,
    };
    if !plausible {
        bail!(
            "Implausible size for {}: {} bytes from {} compressed",
            entry.file_name,
            entry.uncompressed_size,
            entry.compressed_size
        );
    }
    Ok(())
}
