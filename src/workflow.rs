//! The fetch pipeline: resolve, download, extract, write the guide, clean up.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::extract::{ArchiveExtractor, ExtractOutcome};
use crate::io::{Download, HttpDownloader};
use crate::resolve::{PackageRef, ResolvedTarget, resolve};
use crate::stub::write_stub;

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct Report {
    pub target: ResolvedTarget,
    pub extract_dir: PathBuf,
    pub stub_path: PathBuf,
    pub extraction: ExtractOutcome,
    pub download: Download,
}

pub struct Workflow {
    config: Config,
    downloader: HttpDownloader,
    extractor: ArchiveExtractor,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let downloader = HttpDownloader::new(&config)?;
        let extractor = ArchiveExtractor::new(config.unzip_program.as_deref());
        Ok(Self {
            config,
            downloader,
            extractor,
        })
    }

    /// Fetch and unpack documentation for `package`.
    ///
    /// Once the archive has been downloaded it is removed on every exit
    /// path; failing to remove it is only logged.
    pub async fn run(&self, package: &PackageRef) -> Result<Report> {
        let target = resolve(&self.config.base_url, package);
        check_output_name(&target.output_name)?;
        let archive = self.config.archive_path(&target.output_name);
        let extract_dir = self.config.extract_path(&target.output_name);

        info!("Starting download for {} v{}", package.name, package.version);
        info!("Output directory: {}", extract_dir.display());

        fs::create_dir_all(&self.config.output_root)
            .await
            .map_err(|e| FetchError::io(&self.config.output_root, e))?;

        let download = self
            .downloader
            .download(&target.download_url, &archive)
            .await?;

        let unpacked = self.unpack(package, &archive, &extract_dir).await;
        cleanup_archive(&archive).await;
        let (extraction, stub_path) = unpacked?;

        Ok(Report {
            target,
            extract_dir,
            stub_path,
            extraction,
            download,
        })
    }

    async fn unpack(
        &self,
        package: &PackageRef,
        archive: &Path,
        extract_dir: &Path,
    ) -> Result<(ExtractOutcome, PathBuf)> {
        // Start from an empty tree so files from an earlier run don't linger
        match fs::remove_dir_all(extract_dir).await {
            Ok(()) => info!("Replacing previous {}", extract_dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(FetchError::io(extract_dir, e)),
        }

        let extraction = self.extractor.extract(archive, extract_dir).await?;
        if let ExtractOutcome::Degraded { reason } = &extraction {
            if self.config.strict_extract {
                return Err(FetchError::ExtractionFailed {
                    archive: archive.to_path_buf(),
                    reason: reason.clone(),
                });
            }
        }

        let stub_path = write_stub(
            &package.name,
            &package.version.to_string(),
            extract_dir,
            &self.config.docs_site,
        )?;

        Ok((extraction, stub_path))
    }
}

/// The output name is joined onto the output root and later removed
/// recursively, so it must be exactly one plain path component.
fn check_output_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single = matches!(components.next(), Some(Component::Normal(part)) if part == name)
        && components.next().is_none();
    if !single || name.contains(['/', '\\']) {
        return Err(FetchError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

async fn cleanup_archive(archive: &Path) {
    match fs::remove_file(archive).await {
        Ok(()) => info!("Cleaned up ZIP file"),
        Err(e) => warn!("Could not clean up ZIP file {}: {}", archive.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("serde-1.0.195")]
    #[case("tokio-latest")]
    #[case("serde-1.0-latest")]
    fn plain_names_are_accepted(#[case] name: &str) {
        assert!(check_output_name(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("x-1/../../../victim")]
    #[case("x-1/sub")]
    #[case("x-1\\..\\victim")]
    #[case("/tmp/victim")]
    fn names_that_leave_the_root_are_rejected(#[case] name: &str) {
        let err = check_output_name(name).unwrap_err();
        assert!(matches!(err, FetchError::InvalidName { .. }), "{err:?}");
    }
}
