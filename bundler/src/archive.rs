//! Flat ZIP archiver.
//!
//! Walks the working directory, then writes every regular file into one
//! deflate-compressed archive under its base name only. Directory structure is
//! discarded, so two files with the same base name collide; the one enumerated
//! later replaces the earlier entry.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use imgpack_types::{BundleError, ErrorCode};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Archive location.
    pub path: PathBuf,

    /// Entry names in the order they were written.
    pub entries: Vec<String>,

    /// Archive size on disk.
    pub bytes: u64,
}

/// Archive every file under `dir` into `output`.
///
/// `output` may live inside `dir`; it is never archived into itself.
pub fn build_archive(dir: &Path, output: &Path) -> Result<ArchiveSummary, BundleError> {
    let mut files = Vec::new();
    collect_files(dir, output, &mut files)
        .map_err(|e| archive_error(format!("failed to enumerate {}: {e}", dir.display())))?;

    let entries = flatten(files);

    let file = File::create(output).map_err(|e| {
        archive_error(format!("failed to create archive {}: {e}", output.display()))
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, source) in &entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| archive_error(format!("failed to add {name}: {e}")))?;
        let mut reader = File::open(source).map(BufReader::new).map_err(|e| {
            archive_error(format!("failed to read {}: {e}", source.display()))
        })?;
        io::copy(&mut reader, &mut writer)
            .map_err(|e| archive_error(format!("failed to write {name}: {e}")))?;
        debug!(entry = %name, source = %source.display(), "Archived file");
    }

    let file = writer
        .finish()
        .map_err(|e| archive_error(format!("failed to finalize archive: {e}")))?;
    let bytes = file
        .metadata()
        .map(|m| m.len())
        .map_err(|e| archive_error(format!("failed to stat archive: {e}")))?;

    Ok(ArchiveSummary {
        path: output.to_path_buf(),
        entries: entries.into_iter().map(|(name, _)| name).collect(),
        bytes,
    })
}

// Depth-first, each directory sorted by name so enumeration order is stable.
fn collect_files(dir: &Path, exclude: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut children = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    children.sort_by_key(fs::DirEntry::file_name);

    for child in children {
        let path = child.path();
        let file_type = child.file_type()?;
        if file_type.is_dir() {
            collect_files(&path, exclude, out)?;
        } else if file_type.is_file() && path != exclude {
            out.push(path);
        }
    }
    Ok(())
}

/// Key files by base name; a later file keeps the earlier slot but replaces its source.
fn flatten(files: Vec<PathBuf>) -> Vec<(String, PathBuf)> {
    let mut entries: Vec<(String, PathBuf)> = Vec::with_capacity(files.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for path in files {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if let Some(&slot) = index.get(&name) {
            debug!(entry = %name, replaced = %entries[slot].1.display(), "Archive entry collision");
            entries[slot].1 = path;
        } else {
            index.insert(name.clone(), entries.len());
            entries.push((name, path));
        }
    }
    entries
}

fn archive_error(message: String) -> BundleError {
    BundleError::new(ErrorCode::Archive, message)
}
