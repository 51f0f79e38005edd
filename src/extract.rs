//! Archive extraction with an external tool first and the built-in reader
//! as fallback.
//!
//! Failing every strategy is reported as [`ExtractOutcome::Degraded`], not
//! as an error; the caller decides whether that is acceptable.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::fs;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{FetchError, Result};
use crate::io::LocalFileReader;
use crate::zip::ZipExtractor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractStrategy {
    /// Run `<program> -q -o ARCHIVE -d TARGET`
    External(String),
    /// The crate's own ZIP reader
    InProcess,
}

impl fmt::Display for ExtractStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractStrategy::External(program) => f.write_str(program),
            ExtractStrategy::InProcess => f.write_str("built-in unzip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Extracted { strategy: ExtractStrategy },
    /// No strategy worked; the target directory exists and is empty
    Degraded { reason: String },
}

impl ExtractOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ExtractOutcome::Degraded { .. })
    }
}

/// Ordered list of strategies to try
pub struct ArchiveExtractor {
    strategies: Vec<ExtractStrategy>,
}

impl ArchiveExtractor {
    /// External `unzip_program` (if any) first, then the built-in reader.
    pub fn new(unzip_program: Option<&str>) -> Self {
        let mut strategies = Vec::with_capacity(2);
        if let Some(program) = unzip_program {
            strategies.push(ExtractStrategy::External(program.to_string()));
        }
        strategies.push(ExtractStrategy::InProcess);
        Self { strategies }
    }

    pub fn strategies(&self) -> &[ExtractStrategy] {
        &self.strategies
    }

    /// Expand `archive` into `target_dir`, creating the directory first.
    ///
    /// Whatever a failed strategy left behind is cleared before the next one
    /// runs, so a degraded outcome leaves `target_dir` empty. Only a failure
    /// to create or clear `target_dir` is an error.
    pub async fn extract(&self, archive: &Path, target_dir: &Path) -> Result<ExtractOutcome> {
        info!("Extracting to: {}", target_dir.display());
        fs::create_dir_all(target_dir)
            .await
            .map_err(|e| FetchError::io(target_dir, e))?;

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            let attempt = match strategy {
                ExtractStrategy::External(program) => {
                    run_external(program, archive, target_dir).await
                }
                ExtractStrategy::InProcess => run_in_process(archive, target_dir).await,
            };

            match attempt {
                Ok(()) => {
                    info!("Extracted successfully using {}", strategy);
                    return Ok(ExtractOutcome::Extracted {
                        strategy: strategy.clone(),
                    });
                }
                Err(e) => {
                    warn!("{} failed: {:#}", strategy, e);
                    failures.push(format!("{strategy}: {e:#}"));
                    reset_dir(target_dir).await?;
                }
            }
        }

        warn!(
            "Extraction failed. Please manually extract: {}",
            archive.display()
        );
        warn!("   To extract directory: {}", target_dir.display());

        Ok(ExtractOutcome::Degraded {
            reason: failures.join("; "),
        })
    }
}

async fn reset_dir(dir: &Path) -> Result<()> {
    fs::remove_dir_all(dir)
        .await
        .map_err(|e| FetchError::io(dir, e))?;
    fs::create_dir_all(dir)
        .await
        .map_err(|e| FetchError::io(dir, e))
}

async fn run_external(program: &str, archive: &Path, target_dir: &Path) -> anyhow::Result<()> {
    let status = Command::new(program)
        .arg("-q")
        .arg("-o")
        .arg(archive)
        .arg("-d")
        .arg(target_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .await
        .with_context(|| format!("could not run {program}"))?;

    if !status.success() {
        bail!("{} exited with {}", program, status);
    }
    Ok(())
}

async fn run_in_process(archive: &Path, target_dir: &Path) -> anyhow::Result<()> {
    let reader = LocalFileReader::new(archive)
        .with_context(|| format!("could not open {}", archive.display()))?;
    let summary = ZipExtractor::new(Arc::new(reader))
        .extract_all(target_dir)
        .await?;
    info!(
        "Unpacked {} files and {} directories ({} skipped)",
        summary.files, summary.directories, summary.skipped
    );
    Ok(())
}
