//! Recursive directory-to-zip archiver.
//!
//! Every regular file under the source root becomes one entry named by its
//! root-relative path (`/`-separated). Directories are implied, never stored.
//! The destination is truncated on every run, so a rerun never accumulates
//! stale entries.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("source directory not found: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("cannot create archive {}: {source}", path.display())]
    OpenFailed { path: PathBuf, source: io::Error },
    #[error("cannot read {}: {source}", path.display())]
    UnreadableEntry { path: PathBuf, source: io::Error },
    #[error("failed to write archive {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Skip entries that cannot be read instead of failing the archive.
    pub skip_unreadable: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Entry names in the order they were written.
    pub entries: Vec<String>,
    /// Entries left out because they could not be read.
    pub skipped: Vec<PathBuf>,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Archive `source_root` into the zip file at `destination`.
///
/// On failure the partially written destination is removed.
pub fn archive(
    source_root: &Path,
    destination: &Path,
    options: &ArchiveOptions,
) -> Result<ArchiveSummary, ArchiveError> {
    if !source_root.is_dir() {
        return Err(ArchiveError::SourceMissing(source_root.to_path_buf()));
    }
    let root = source_root
        .canonicalize()
        .map_err(|source| ArchiveError::UnreadableEntry {
            path: source_root.to_path_buf(),
            source,
        })?;

    let file = File::create(destination).map_err(|source| ArchiveError::OpenFailed {
        path: destination.to_path_buf(),
        source,
    })?;
    let destination_real = destination.canonicalize().ok();

    info!(
        source = %root.display(),
        destination = %destination.display(),
        "creating archive"
    );

    let (entries, skipped) =
        match write_entries(&root, file, destination, destination_real.as_deref(), options) {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(destination);
                return Err(e);
            }
        };

    let (size_bytes, sha256) =
        digest_file(destination).map_err(|source| ArchiveError::UnreadableEntry {
            path: destination.to_path_buf(),
            source,
        })?;

    info!(
        entries = entries.len(),
        skipped = skipped.len(),
        size_bytes,
        %sha256,
        "archive created"
    );

    Ok(ArchiveSummary {
        path: destination.to_path_buf(),
        entries,
        skipped,
        size_bytes,
        sha256,
    })
}

fn write_entries(
    root: &Path,
    file: File,
    destination: &Path,
    destination_real: Option<&Path>,
    options: &ArchiveOptions,
) -> Result<(Vec<String>, Vec<PathBuf>), ArchiveError> {
    let write_err = |source: zip::result::ZipError| ArchiveError::Write {
        path: destination.to_path_buf(),
        source,
    };

    let mut zip = ZipWriter::new(file);
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                unreadable(options, &mut skipped, path, io::Error::from(err))?;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }
        if is_destination(entry.path(), destination_real) {
            debug!(path = %entry.path().display(), "skipping the archive itself");
            continue;
        }

        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(source) => {
                unreadable(options, &mut skipped, entry.path().to_path_buf(), source)?;
                continue;
            }
        };

        let name = entry_name(root, entry.path());
        let mut file_options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = entry.metadata() {
                file_options = file_options.unix_permissions(meta.permissions().mode());
            }
        }

        zip.start_file(name.as_str(), file_options)
            .map_err(write_err)?;
        zip.write_all(&bytes).map_err(|e| write_err(e.into()))?;
        debug!(entry = %name, bytes = bytes.len(), "added");
        entries.push(name);
    }

    zip.finish().map_err(write_err)?;
    Ok((entries, skipped))
}

fn unreadable(
    options: &ArchiveOptions,
    skipped: &mut Vec<PathBuf>,
    path: PathBuf,
    source: io::Error,
) -> Result<(), ArchiveError> {
    if !options.skip_unreadable {
        return Err(ArchiveError::UnreadableEntry { path, source });
    }
    warn!(path = %path.display(), error = %source, "skipping unreadable entry");
    skipped.push(path);
    Ok(())
}

fn is_destination(path: &Path, destination_real: Option<&Path>) -> bool {
    let Some(destination_real) = destination_real else {
        return false;
    };
    if path.file_name() != destination_real.file_name() {
        return false;
    }
    path.canonicalize()
        .is_ok_and(|real| real == destination_real)
}

/// Root-relative entry name with `/` separators.
fn entry_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Size and SHA-256 hex digest of a file.
fn digest_file(path: &Path) -> io::Result<(u64, String)> {
    let bytes = fs::read(path)?;
    let hash = Sha256::digest(&bytes);
    Ok((bytes.len() as u64, hex::encode(hash)))
}
