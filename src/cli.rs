use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{self, Config};
use crate::resolve::PackageRef;

#[derive(Parser, Debug)]
#[command(name = "docfetch")]
#[command(version)]
#[command(about = "Download docs.rs documentation for offline browsing", long_about = None)]
#[command(after_help = "Examples:\n  \
  docfetch tokio latest      download the latest version\n  \
  docfetch serde 1.0.0       download a specific version\n  \
  docfetch reqwest ~0.12     download the latest 0.12.x")]
pub struct Cli {
    /// Crate name
    #[arg(value_name = "CRATE")]
    pub package: String,

    /// Version: `latest`, an exact version, or `~PREFIX`
    #[arg(id = "version_spec", value_name = "VERSION", default_value = "latest")]
    pub version: String,

    /// Directory receiving the documentation
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        default_value = config::DEFAULT_OUTPUT_ROOT
    )]
    pub output_dir: PathBuf,

    /// Archive host prefix
    #[arg(long, value_name = "URL", default_value = config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Seconds without network activity before giving up
    #[arg(long, value_name = "SECS", default_value_t = config::DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Maximum redirects to follow
    #[arg(long, value_name = "N", default_value_t = config::DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: u32,

    /// External unzip program tried before the built-in extractor
    #[arg(long, value_name = "PROG", default_value = config::DEFAULT_UNZIP_PROGRAM)]
    pub unzip: String,

    /// Only use the built-in extractor
    #[arg(long, conflicts_with = "unzip")]
    pub no_unzip: bool,

    /// Fail if the archive cannot be extracted
    #[arg(long)]
    pub strict: bool,

    /// Ignore HTTP(S)_PROXY settings
    #[arg(long)]
    pub no_proxy: bool,

    /// Quiet mode, warnings only
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More logging (-vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn package(&self) -> PackageRef {
        PackageRef::new(self.package.clone(), Some(&self.version))
    }

    pub fn config(&self) -> Config {
        Config {
            base_url: self.base_url.clone(),
            output_root: self.output_dir.clone(),
            max_redirects: self.max_redirects,
            timeout: Duration::from_secs(self.timeout),
            unzip_program: (!self.no_unzip).then(|| self.unzip.clone()),
            system_proxy: !self.no_proxy,
            strict_extract: self.strict,
            ..Config::default()
        }
    }

    /// Default log filter derived from `-q` / `-v`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::VersionSpec;

    #[test]
    fn version_defaults_to_latest() {
        let cli = Cli::try_parse_from(["docfetch", "tokio"]).unwrap();
        assert_eq!(cli.package().version, VersionSpec::Latest);

        let config = cli.config();
        assert_eq!(config.output_root, PathBuf::from("./rust-docs"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.unzip_program.as_deref(), Some("unzip"));
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn flags_feed_the_config() {
        let cli = Cli::try_parse_from([
            "docfetch",
            "reqwest",
            "~0.12",
            "-o",
            "/tmp/docs",
            "--timeout",
            "5",
            "--max-redirects",
            "2",
            "--no-unzip",
            "--strict",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.package().version, VersionSpec::Fuzzy("0.12".into()));
        let config = cli.config();
        assert_eq!(config.output_root, PathBuf::from("/tmp/docs"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.unzip_program, None);
        assert!(config.strict_extract);
        assert_eq!(cli.log_level(), "trace");
    }

    #[test]
    fn crate_name_is_required() {
        let err = Cli::try_parse_from(["docfetch"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
