//! Image bundling pipeline.
//!
//! One invocation downloads every source image into a private working
//! directory, packs the directory into a flat ZIP, and POSTs the ZIP to the
//! caller's destination.
//!
//! # Pipeline
//!
//! 1. **Validate** - [`BundleRequest::from_event`] rejects malformed payloads before any IO
//! 2. **Workspace** - `<work_dir>/<token><random>`, removed on drop
//! 3. **Download** - sequential GETs into `sources/` with a per-request timeout; first failure aborts
//! 4. **Archive** - flat, deflate-compressed ZIP of `sources/`, written beside it
//! 5. **Upload** - multipart POST of the archive
//!
//! Steps 2-5 report failures as [`BundleError`]; [`Bundler::handle`] turns any of
//! them into a status-500 [`InvocationResponse`]. Validation failures are
//! returned as [`EventError`] instead, so the host reports them as invocation
//! errors.
//!
//! # Usage
//!
//! ```ignore
//! use imgpack_bundler::Bundler;
//! use imgpack_config::BundlerConfig;
//!
//! let bundler = Bundler::new(&BundlerConfig::load()?)?;
//! let response = bundler.handle(&event).await?;
//! assert_eq!(response.status_code, 200);
//! ```

mod archive;
mod download;
mod resolved;
mod upload;
mod workspace;

use std::path::Path;
use std::time::Instant;

use imgpack_config::BundlerConfig;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info};

use resolved::ResolvedConfig;

pub use archive::{ArchiveSummary, build_archive};
pub use download::{download_all, file_name_for};
pub use imgpack_types::{BundleError, BundleRequest, ErrorCode, EventError, InvocationResponse};
pub use upload::FILE_FIELD;
pub use workspace::Workspace;

/// What a successful run produced, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    pub downloaded: usize,
    pub entries: Vec<String>,
    pub archive_bytes: u64,
}

/// Process-wide pipeline state: resolved configuration and a pooled HTTP client.
///
/// Build once at startup and share across invocations. Holds no per-request
/// state.
#[derive(Debug, Clone)]
pub struct Bundler {
    client: Client,
    config: ResolvedConfig,
}

impl Bundler {
    pub fn new(config: &BundlerConfig) -> Result<Self, BundleError> {
        let config = ResolvedConfig::from_config(config);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                BundleError::new(
                    ErrorCode::Internal,
                    format!("failed to build HTTP client: {e}"),
                )
            })?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }

    /// Validate `event` and run the pipeline.
    ///
    /// `Err` only for payload shape defects; every later failure is folded into
    /// a 500 response.
    pub async fn handle(&self, event: &Value) -> Result<InvocationResponse, EventError> {
        let request = BundleRequest::from_event(event).inspect_err(|e| {
            error!(error = %e, "Rejected invocation payload");
        })?;
        Ok(self.handle_request(&request).await)
    }

    /// Run the pipeline for an already validated request.
    pub async fn handle_request(&self, request: &BundleRequest) -> InvocationResponse {
        let started = Instant::now();
        let outcome = self.run(request).await;

        match &outcome {
            Ok(report) => info!(
                token = %request.token,
                downloaded = report.downloaded,
                entries = report.entries.len(),
                archive_bytes = report.archive_bytes,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Images zipped and uploaded"
            ),
            Err(e) => error!(
                token = %request.token,
                code = %e.code,
                details = %e.details,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Bundle failed: {e}"
            ),
        }

        InvocationResponse::from_outcome(&outcome)
    }

    /// Workspace → download → archive → upload.
    ///
    /// The workspace is dropped (and removed) before this returns, on every path.
    pub async fn run(&self, request: &BundleRequest) -> Result<BundleReport, BundleError> {
        let workspace = Workspace::create(&self.config.work_dir, &request.token)?;

        info!(sources = request.sources.len(), "Downloading sources");
        let downloaded = download_all(
            &self.client,
            &request.sources,
            workspace.sources(),
            self.config.download_timeout,
        )
        .await?;

        let dir = workspace.sources().to_path_buf();
        let output = workspace.archive_path();
        let summary = tokio::task::spawn_blocking(move || build_archive(&dir, &output))
            .await
            .map_err(|e| {
                BundleError::new(ErrorCode::Archive, format!("archive task failed: {e}"))
            })??;
        info!(
            entries = summary.entries.len(),
            bytes = summary.bytes,
            "Built archive"
        );

        let archive_bytes = upload::upload_archive(
            &self.client,
            &summary.path,
            workspace.archive_name(),
            &request.upload_url,
            self.config.upload_timeout,
        )
        .await?;

        Ok(BundleReport {
            downloaded: downloaded.len(),
            entries: summary.entries,
            archive_bytes,
        })
    }
}
