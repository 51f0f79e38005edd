//! Built-in ZIP archive reader.
//!
//! Used when no external unzip tool is available. Handles the subset of
//! the format documentation archives use:
//!
//! - Standard ZIP and ZIP64 end records
//! - STORED and DEFLATE members, with CRC-32 verification
//!
//! Encrypted members and multi-disk archives are not supported.

mod extractor;
mod parser;
mod structures;

pub use extractor::{ExtractSummary, ZipExtractor};
pub use structures::*;
