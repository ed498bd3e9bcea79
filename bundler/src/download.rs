//! Sequential source downloader.
//!
//! Each URL is fetched with a fixed per-request timeout and written into the
//! working directory under the last segment of its path. The first failure
//! aborts the batch; there is no retry and no partial success.

use std::path::{Path, PathBuf};
use std::time::Duration;

use imgpack_types::{BundleError, ErrorCode};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Download every source into `dir`, in order.
///
/// Returns the written paths in source order. Two sources with the same base
/// name write the same path; the later one wins.
pub async fn download_all(
    client: &Client,
    sources: &[String],
    dir: &Path,
    timeout: Duration,
) -> Result<Vec<PathBuf>, BundleError> {
    let mut written = Vec::with_capacity(sources.len());
    for source in sources {
        written.push(download_one(client, source, dir, timeout).await?);
    }
    Ok(written)
}

async fn download_one(
    client: &Client,
    source: &str,
    dir: &Path,
    timeout: Duration,
) -> Result<PathBuf, BundleError> {
    let url = Url::parse(source).map_err(|e| {
        download_error(format!("invalid source URL {source:?}: {e}"), source)
    })?;

    let response = client
        .get(url.as_str())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| request_error(&e, source, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(download_error(
            format!(
                "HTTP {} {} for url: {source}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ),
            source,
        )
        .with_detail("status", status.as_u16().to_string()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| request_error(&e, source, timeout))?;

    let file_name = file_name_for(&url).ok_or_else(|| {
        download_error(
            format!("cannot derive a file name from {source}: path has no final segment"),
            source,
        )
    })?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, &body).await.map_err(|e| {
        download_error(format!("failed to write {}: {e}", path.display()), source)
    })?;

    debug!(url = source, path = %path.display(), bytes = body.len(), "Downloaded source");
    Ok(path)
}

/// Last path segment of `url`, ignoring query and fragment.
///
/// Returns `None` when the path is empty or ends in `/`, and for URLs that
/// have no hierarchical path at all (`data:`, `mailto:`).
#[must_use]
pub fn file_name_for(url: &Url) -> Option<&str> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
}

fn download_error(message: String, source: &str) -> BundleError {
    BundleError::new(ErrorCode::Download, message).with_detail("url", source)
}

fn request_error(err: &reqwest::Error, source: &str, timeout: Duration) -> BundleError {
    if err.is_timeout() {
        return download_error(
            format!("timed out after {}s fetching {source}", timeout.as_secs()),
            source,
        )
        .with_detail("timeout_seconds", timeout.as_secs().to_string());
    }
    download_error(format!("failed to fetch {source}: {err}"), source)
}
