//! Image download: fetch one remote file and persist it atomically.
//!
//! ## Why follow redirects by hand?
//!
//! The archive's image hosts answer with 301/302 chains (CDN → S3 → regional
//! endpoint). The client is built with redirects disabled so each hop is
//! logged, relative `Location` headers are resolved explicitly, and a loop
//! turns into a clear [`FetchError::TooManyRedirects`] instead of a generic
//! transport error. Any other non-2xx status is a failure; an error page is
//! never written to disk as if it were the image.
//!
//! The body is buffered in memory, written to `<dest>.part`, then renamed, so
//! an interrupted run never leaves a truncated image under the final name.

use crate::error::{FetchError, MigrateError};
use reqwest::{header, Client, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Knobs for [`fetch_image`].
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Maximum 301/302 hops before giving up.
    pub max_redirects: u32,
    /// Reported in [`FetchError::Timeout`]; the limit itself lives on the client.
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            timeout_secs: 120,
        }
    }
}

/// Build the HTTP client used for every image of a run.
///
/// Redirects are disabled; [`fetch_image`] follows them itself.
pub fn build_client(timeout_secs: u64) -> Result<Client, MigrateError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| MigrateError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Check if the input string looks like a fetchable URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Download `url` to `dest`, following 301/302 redirects.
///
/// Returns the number of bytes written.
pub async fn fetch_image(
    client: &Client,
    url: &str,
    dest: &Path,
    options: &FetchOptions,
) -> Result<u64, FetchError> {
    let mut current = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        detail: e.to_string(),
    })?;
    let mut hops = 0u32;

    loop {
        let response = client
            .get(current.clone())
            .send()
            .await
            .map_err(|e| request_error(current.as_str(), &e, options))?;
        let status = response.status();

        if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
            if hops >= options.max_redirects {
                return Err(FetchError::TooManyRedirects {
                    url: url.to_string(),
                    hops,
                });
            }
            let next = redirect_target(&current, &response)?;
            debug!("{} {} → {}", status.as_u16(), current, next);
            current = next;
            hops += 1;
            continue;
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: current.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_error(current.as_str(), &e, options))?;

        write_atomic(dest, &bytes).await?;
        return Ok(bytes.len() as u64);
    }
}

/// Resolve the `Location` header of a redirect against the current URL.
fn redirect_target(current: &Url, response: &reqwest::Response) -> Result<Url, FetchError> {
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FetchError::MissingLocation {
            url: current.to_string(),
        })?;

    current.join(location).map_err(|e| FetchError::InvalidUrl {
        url: location.to_string(),
        detail: e.to_string(),
    })
}

fn request_error(url: &str, e: &reqwest::Error, options: &FetchOptions) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            secs: options.timeout_secs,
        }
    } else {
        FetchError::RequestFailed {
            url: url.to_string(),
            detail: e.to_string(),
        }
    }
}

/// Write to `<dest>.part`, then rename over `dest`.
async fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    let write_failed = |e: std::io::Error| FetchError::WriteFailed {
        path: dest.to_path_buf(),
        detail: e.to_string(),
    };

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp = part_path(dest);
    tokio::fs::write(&tmp, bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp, dest).await.map_err(write_failed)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
