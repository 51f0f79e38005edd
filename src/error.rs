//! Error types for a documentation fetch run.
//!
//! Everything that can abort the workflow is a [`FetchError`]. A degraded
//! extraction is not an error unless strict extraction was requested.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = FetchError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a status other than 200 (or a bare 3xx).
    #[error("HTTP {status}: {reason}")]
    Http {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("Too many redirects (more than {max})")]
    TooManyRedirects { max: u32 },

    #[error("Request timeout after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    /// DNS, connect, TLS or mid-body transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme: {url}")]
    UnsupportedScheme { url: String },

    /// The crate name or version would not map to a single directory
    /// under the output root.
    #[error("invalid output name {name:?}: must be a single path component")]
    InvalidName { name: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Only produced when degraded extraction is configured to be fatal.
    #[error("could not extract {}: {reason}", .archive.display())]
    ExtractionFailed { archive: PathBuf, reason: String },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Follow-up advice for failures the user can act on.
///
/// `site` is the documentation site root, e.g. `https://docs.rs`.
pub fn failure_hint(err: &FetchError, package: &str, site: &str) -> Option<String> {
    match err.status()? {
        404 => Some(format!(
            "The crate or version may not exist on docs.rs\n   \
             Check: {site}/{package}\n   \
             Or search: https://crates.io/search?q={package}"
        )),
        429 => Some(
            "Rate limited by docs.rs. Please wait and try again later.\n   \
             Each crate version can only be downloaded once per 24 hours."
                .to_string(),
        ),
        _ => None,
    }
}
