//! # docfetch
//!
//! Download the documentation archive docs.rs publishes for a crate,
//! unpack it, and leave a short guide for browsing it locally.
//!
//! A run is a straight line: resolve the crate and version into a download
//! URL, fetch it (following redirects by hand, with an inactivity timeout),
//! extract it with the system `unzip` or the built-in reader, write
//! `README-local.md`, and delete the archive.
//!
//! ## Example
//!
//! ```no_run
//! use docfetch::{Config, PackageRef, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let workflow = Workflow::new(Config::default())?;
//!     let report = workflow.run(&PackageRef::new("serde", Some("1.0.0"))).await?;
//!     println!("{}", report.extract_dir.display());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod io;
pub mod resolve;
pub mod stub;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod workflow;
pub mod zip;

pub use cli::Cli;
pub use config::Config;
pub use error::{FetchError, failure_hint};
pub use extract::{ArchiveExtractor, ExtractOutcome, ExtractStrategy};
pub use io::{Download, HttpDownloader, LocalFileReader, MemoryReader, ReadAt};
pub use resolve::{PackageRef, ResolvedTarget, VersionSpec, resolve};
pub use workflow::{Report, Workflow};
pub use zip::{ZipExtractor, ZipFileEntry};
