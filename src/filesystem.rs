//! Filesystem gateway used by the orchestrator and the undo manager.
//!
//! Every mutation of the managed tree goes through the [`FileSystem`] trait so
//! that planning stays pure and tests can inject failures. [`StdFileSystem`] is
//! the production implementation backed by `std::fs` and the `glob` crate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use crate::error::{FsError, FsResult};

/// Matching rules for the input file pattern: case-sensitive, `*` never
/// crosses a directory boundary, leading dots may be matched by wildcards.
const LISTING_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Timestamps available for a file. Either may be missing on some platforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTimes {
    pub modified: Option<DateTime<Local>>,
    pub created: Option<DateTime<Local>>,
}

/// Filesystem primitives the pipeline relies on.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Lists regular files under `dir` matching `pattern`, sorted by path.
    ///
    /// The pattern is relative to `dir`. A plain pattern such as `*.jpg` only
    /// looks at the top level; a pattern with a separator or `**` descends.
    fn list_files(&self, dir: &Path, pattern: &str) -> FsResult<Vec<PathBuf>>;

    fn file_times(&self, path: &Path) -> FsResult<FileTimes>;

    fn create_dir_all(&self, path: &Path) -> FsResult<()>;

    /// Moves `from` to `to`. Fails with [`FsError::AlreadyExists`] rather than
    /// overwriting an existing destination.
    fn move_file(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Removes `path` if it is an empty directory. Returns whether it was removed.
    fn remove_empty_dir(&self, path: &Path) -> FsResult<bool>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling link still counts as occupied
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(&self, dir: &Path, pattern: &str) -> FsResult<Vec<PathBuf>> {
        validate_pattern(pattern)?;

        let metadata = fs::metadata(dir).map_err(|e| FsError::from_io("list", dir, e))?;
        if !metadata.is_dir() {
            return Err(FsError::NotFound {
                path: dir.to_path_buf(),
            });
        }

        let full_pattern = format!(
            "{}/{}",
            Pattern::escape(&dir.to_string_lossy()),
            pattern.trim_start_matches("./")
        );
        let entries =
            glob::glob_with(&full_pattern, LISTING_OPTIONS).map_err(|e| FsError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.msg.to_string(),
            })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        files.push(path);
                    }
                }
                Err(e) => warn!(path = %e.path().display(), error = %e.error(), "skipping unreadable entry"),
            }
        }
        files.sort();
        debug!(dir = %dir.display(), pattern, count = files.len(), "listed files");
        Ok(files)
    }

    fn file_times(&self, path: &Path) -> FsResult<FileTimes> {
        let metadata = fs::metadata(path).map_err(|e| FsError::from_io("stat", path, e))?;
        Ok(FileTimes {
            modified: metadata.modified().ok().map(to_local),
            created: metadata.created().ok().map(to_local),
        })
    }

    fn create_dir_all(&self, path: &Path) -> FsResult<()> {
        fs::create_dir_all(path).map_err(|e| FsError::from_io("create directory", path, e))
    }

    fn move_file(&self, from: &Path, to: &Path) -> FsResult<()> {
        if !from.is_file() {
            return Err(FsError::NotFound {
                path: from.to_path_buf(),
            });
        }
        if self.exists(to) {
            return Err(FsError::AlreadyExists {
                path: to.to_path_buf(),
            });
        }

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying");
                fs::copy(from, to).map_err(|e| FsError::from_io("copy", to, e))?;
                fs::remove_file(from).map_err(|e| FsError::from_io("remove", from, e))
            }
            Err(e) => Err(FsError::from_io("move", from, e)),
        }
    }

    fn remove_empty_dir(&self, path: &Path) -> FsResult<bool> {
        let mut entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(FsError::from_io("read directory", path, e)),
        };
        if entries.next().is_some() {
            return Ok(false);
        }
        fs::remove_dir(path).map_err(|e| FsError::from_io("remove directory", path, e))?;
        Ok(true)
    }
}

/// Rejects patterns that are syntactically invalid or that would escape the
/// target directory.
pub fn validate_pattern(pattern: &str) -> FsResult<()> {
    let invalid = |reason: &str| FsError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    if pattern.is_empty() {
        return Err(invalid("pattern is empty"));
    }
    if Path::new(pattern).is_absolute() {
        return Err(invalid("pattern must be relative to the target directory"));
    }
    if pattern.split('/').any(|part| part == "..") {
        return Err(invalid("pattern must not leave the target directory"));
    }
    Pattern::new(pattern).map_err(|e| invalid(e.msg))?;
    Ok(())
}

fn to_local(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}
