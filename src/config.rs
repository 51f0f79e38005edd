use std::path::PathBuf;
use std::time::Duration;

/// Archive host prefix; packages live at `{base}/{name}/{version}/download`.
pub const DEFAULT_BASE_URL: &str = "https://docs.rs/crate";

/// Site used for human-facing links (stub file, failure hints).
pub const DEFAULT_DOCS_SITE: &str = "https://docs.rs";

pub const DEFAULT_OUTPUT_ROOT: &str = "./rust-docs";
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_UNZIP_PROGRAM: &str = "unzip";

/// Settings for one fetch run.
///
/// Everything the workflow needs from the outside world is carried here,
/// so tests can point it at a local stub server with short timeouts.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix of the download endpoint, without trailing slash
    pub base_url: String,
    /// Documentation site referenced in the stub file and hints
    pub docs_site: String,
    /// Directory receiving archives and extracted trees
    pub output_root: PathBuf,
    /// Maximum number of redirects followed per download
    pub max_redirects: u32,
    /// Inactivity timeout for headers and each body chunk
    pub timeout: Duration,
    /// External unzip tool tried before the built-in reader; `None` skips it
    pub unzip_program: Option<String>,
    /// Honour `HTTP(S)_PROXY` environment settings
    pub system_proxy: bool,
    /// Treat a degraded extraction as a failed run
    pub strict_extract: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            docs_site: DEFAULT_DOCS_SITE.to_string(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: DEFAULT_TIMEOUT,
            unzip_program: Some(DEFAULT_UNZIP_PROGRAM.to_string()),
            system_proxy: true,
            strict_extract: false,
        }
    }
}

impl Config {
    /// Path of the transient archive for an output name.
    pub fn archive_path(&self, output_name: &str) -> PathBuf {
        self.output_root.join(format!("{output_name}.zip"))
    }

    /// Path of the extracted tree for an output name.
    pub fn extract_path(&self, output_name: &str) -> PathBuf {
        self.output_root.join(output_name)
    }
}
