//! Per-invocation working directory.
//!
//! The directory lives exactly as long as the [`Workspace`] value: dropping it
//! removes the tree recursively, so every exit path out of the pipeline
//! (success, `?` propagation, unwinding) releases it.
//!
//! ```text
//! <root>/<token><random>/
//!     sources/        downloaded files, the only tree that is archived
//!     <token>.zip     the archive
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use imgpack_types::{BundleError, ErrorCode};
use tempfile::TempDir;
use tracing::{debug, warn};

const SOURCES_DIR: &str = "sources";

#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    sources: PathBuf,
    archive_name: String,
    guard: Option<TempDir>,
}

impl Workspace {
    /// Create `<root>/<token><random>` and its `sources/` directory.
    pub fn create(root: &Path, token: &str) -> Result<Self, BundleError> {
        let workspace_error = |e: std::io::Error| {
            BundleError::new(
                ErrorCode::Workspace,
                format!("failed to create working directory: {e}"),
            )
            .with_detail("root", root.display().to_string())
        };

        let dir = tempfile::Builder::new()
            .prefix(token)
            .tempdir_in(root)
            .map_err(workspace_error)?;
        let sources = dir.path().join(SOURCES_DIR);
        fs::create_dir(&sources).map_err(workspace_error)?;

        debug!(path = %dir.path().display(), "Created working directory");
        Ok(Self {
            path: dir.path().to_path_buf(),
            sources,
            archive_name: format!("{token}.zip"),
            guard: Some(dir),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Download target. Holds nothing but downloaded files.
    #[must_use]
    pub fn sources(&self) -> &Path {
        &self.sources
    }

    /// Where the archive is written: beside `sources/`, never inside it, and
    /// removed with the workspace.
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.path.join(&self.archive_name)
    }

    #[must_use]
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

}

impl Drop for Workspace {
    fn drop(&mut self) {
        let Some(dir) = self.guard.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => debug!(path = %self.path.display(), "Removed working directory"),
            Err(e) => warn!(
                path = %self.path.display(),
                "Failed to remove working directory: {e}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Workspace;
    use imgpack_types::ErrorCode;

    #[test]
    fn directory_is_prefixed_with_token() {
        let root = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::create(root.path(), "job-7").expect("create");

        let name = workspace.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("job-7"), "{name}");
        assert!(workspace.path().is_dir());
        assert!(workspace.sources().is_dir());
        assert_eq!(workspace.archive_path(), workspace.path().join("job-7.zip"));
    }

    #[test]
    fn archive_path_is_outside_sources() {
        let root = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::create(root.path(), "job-7").expect("create");

        assert!(!workspace.archive_path().starts_with(workspace.sources()));
        assert_eq!(workspace.archive_path().parent(), Some(workspace.path()));
    }

    #[test]
    fn drop_removes_directory_tree() {
        let root = tempfile::tempdir().expect("tempdir");
        let path = {
            let workspace = Workspace::create(root.path(), "t").expect("create");
            std::fs::create_dir(workspace.path().join("nested")).unwrap();
            std::fs::write(workspace.path().join("nested/a.jpg"), b"x").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn missing_root_is_workspace_error() {
        let root = tempfile::tempdir().expect("tempdir");
        let err = Workspace::create(&root.path().join("absent"), "t").unwrap_err();
        assert_eq!(err.code, ErrorCode::Workspace);
    }
}
