//! Multipart uploader for the finished archive.

use std::path::Path;

use imgpack_types::{BundleError, ErrorCode};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::resolved::TimeoutSetting;

/// Form field the archive is sent under.
pub const FILE_FIELD: &str = "file";

const ARCHIVE_MIME: &str = "application/zip";

/// POST `archive` to `destination` as `multipart/form-data`.
///
/// Returns the number of archive bytes sent.
pub(crate) async fn upload_archive(
    client: &Client,
    archive: &Path,
    file_name: &str,
    destination: &str,
    timeout: TimeoutSetting,
) -> Result<u64, BundleError> {
    let shown = display_url(destination);
    let bytes = tokio::fs::read(archive).await.map_err(|e| {
        upload_error(
            format!("failed to read archive {}: {e}", archive.display()),
            &shown,
        )
    })?;
    let size = bytes.len() as u64;

    let part = Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(ARCHIVE_MIME)
        .map_err(|e| upload_error(format!("invalid archive part: {e}"), &shown))?;
    let form = Form::new().part(FILE_FIELD, part);

    let mut request = client.post(destination).multipart(form);
    if let TimeoutSetting::Enabled(limit) = timeout {
        request = request.timeout(limit);
    }

    let response = request.send().await.map_err(|e| {
        let message = if e.is_timeout() {
            format!("timed out uploading archive to {shown}")
        } else {
            format!("failed to upload archive to {shown}: {}", e.without_url())
        };
        upload_error(message, &shown)
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(upload_error(
            format!(
                "HTTP {} {} for url: {shown}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ),
            &shown,
        )
        .with_detail("status", status.as_u16().to_string()));
    }

    debug!(bytes = size, status = status.as_u16(), "Uploaded archive");
    Ok(size)
}

fn upload_error(message: String, shown_url: &str) -> BundleError {
    BundleError::new(ErrorCode::Upload, message).with_detail("url", shown_url)
}

/// Destination without its query string. Presigned URLs carry credentials there.
fn display_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}
