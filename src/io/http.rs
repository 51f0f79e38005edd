use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode, Url, redirect};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{FetchError, Result};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Outcome of one GET in a redirect chain
enum Hop {
    /// Body written to the destination; carries the byte count
    Done(u64),
    Redirect(Url),
}

/// A completed download
#[derive(Debug, Clone)]
pub struct Download {
    pub path: PathBuf,
    /// URL that finally answered 200
    pub final_url: String,
    pub bytes: u64,
    pub redirects: u32,
}

/// Plain GET downloader that follows redirects itself.
///
/// The HTTP client never follows redirects on its own; the chain is walked
/// by [`HttpDownloader::download`] so the hop count stays bounded and the
/// partial file can be dropped between hops.
pub struct HttpDownloader {
    client: Client,
    max_redirects: u32,
    timeout: Duration,
}

impl HttpDownloader {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT)
            .connect_timeout(config.timeout);
        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            max_redirects: config.max_redirects,
            timeout: config.timeout,
        })
    }

    /// Download `url` into `dest`, following up to the configured number of
    /// redirects.
    ///
    /// On any failure the partially written `dest` is removed (best effort).
    pub async fn download(&self, url: &str, dest: &Path) -> Result<Download> {
        let result = self.follow(url, dest).await;
        if result.is_err() {
            remove_partial(dest).await;
        }
        result
    }

    async fn follow(&self, url: &str, dest: &Path) -> Result<Download> {
        let mut current = parse_url(url)?;
        let mut redirects = 0u32;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| FetchError::io(parent, e))?;
            }
        }

        loop {
            let mut file = fs::File::create(dest)
                .await
                .map_err(|e| FetchError::io(dest, e))?;

            info!("Downloading from: {}", current);

            match self.fetch_once(&current, &mut file, dest).await? {
                Hop::Done(bytes) => {
                    info!("Downloaded: {} ({} bytes)", dest.display(), bytes);
                    return Ok(Download {
                        path: dest.to_path_buf(),
                        final_url: current.to_string(),
                        bytes,
                        redirects,
                    });
                }
                Hop::Redirect(next) => {
                    drop(file);
                    remove_partial(dest).await;

                    redirects += 1;
                    if redirects > self.max_redirects {
                        return Err(FetchError::TooManyRedirects {
                            max: self.max_redirects,
                        });
                    }

                    info!("Redirecting to: {}", next);
                    current = next;
                }
            }
        }
    }

    /// Issue a single GET and either stream the body into `file` or report
    /// where the server redirected to.
    async fn fetch_once(&self, url: &Url, file: &mut fs::File, dest: &Path) -> Result<Hop> {
        let mut response = self
            .with_timeout(self.client.get(url.clone()).send())
            .await??;
        let status = response.status();
        debug!("{} answered {}", url, status);

        if status.is_redirection() {
            if let Some(location) = response.headers().get(LOCATION) {
                let location = location.to_str().map_err(|e| FetchError::InvalidUrl {
                    url: String::from_utf8_lossy(location.as_bytes()).into_owned(),
                    reason: e.to_string(),
                })?;
                let next = url.join(location).map_err(|e| FetchError::InvalidUrl {
                    url: location.to_string(),
                    reason: e.to_string(),
                })?;
                check_scheme(&next)?;
                return Ok(Hop::Redirect(next));
            }
        }

        if status != StatusCode::OK {
            return Err(FetchError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                url: url.to_string(),
            });
        }

        let mut bytes = 0u64;
        while let Some(chunk) = self.with_timeout(response.chunk()).await?? {
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(dest, e))?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| FetchError::io(dest, e))?;

        Ok(Hop::Done(bytes))
    }

    /// Bound a single wait (headers or one body chunk) by the inactivity timeout.
    async fn with_timeout<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| FetchError::Timeout {
                after: self.timeout,
            })
    }
}

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    check_scheme(&parsed)?;
    Ok(parsed)
}

fn check_scheme(url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(FetchError::UnsupportedScheme {
            url: url.to_string(),
        }),
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Could not remove partial file {}: {}", path.display(), e);
        }
    }
}
