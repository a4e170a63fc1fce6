/// Undo support for reverting the most recent run.
///
/// The undo log lives at an explicit path outside the managed tree and holds
/// only the operations that actually executed, plus the directories the run
/// created. Undo replays the log backwards, one file at a time, so a file that
/// cannot be restored never blocks the others.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FsError, OrganizeError, OrganizeResult};
use crate::filesystem::FileSystem;
use crate::operation::{Operation, OperationResults};

/// Current on-disk format version of the undo log.
pub const UNDO_LOG_VERSION: u32 = 1;

const DEFAULT_LOG_DIR: &str = ".dirshift";
const DEFAULT_LOG_FILE: &str = "undo_log.json";

/// A persisted record of one executed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoLog {
    pub version: u32,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// The directory the run operated on.
    pub target_dir: PathBuf,
    /// Executed operations, in execution order.
    pub operations: Vec<Operation>,
    /// Directories created by the run, in creation order.
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
}

impl UndoLog {
    pub fn new(target_dir: PathBuf, operations: Vec<Operation>, created_dirs: Vec<PathBuf>) -> Self {
        Self {
            version: UNDO_LOG_VERSION,
            timestamp: Utc::now(),
            target_dir,
            operations,
            created_dirs,
        }
    }
}

/// Reads, writes and replays the undo log at a fixed path.
#[derive(Debug, Clone)]
pub struct UndoManager {
    log_path: PathBuf,
}

impl UndoManager {
    /// Creates a manager for the log stored at `log_path`.
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    /// `$HOME/.dirshift/undo_log.json`, or the same under the system temp
    /// directory when no home directory is set.
    pub fn default_log_path() -> PathBuf {
        let base = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        base.join(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE)
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Returns true if a log file is present.
    pub fn has_log(&self) -> bool {
        self.log_path.is_file()
    }

    /// Replaces the log with `log`.
    ///
    /// The log is written to a sibling temp file first and then renamed over the
    /// old one, so readers only ever see a complete log.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::UndoLogWrite` if the directory, the temp file or
    /// the rename fails.
    pub fn record(&self, log: &UndoLog) -> OrganizeResult<()> {
        let write_error = |source: std::io::Error| OrganizeError::UndoLogWrite {
            path: self.log_path.clone(),
            source,
        };

        if let Some(parent) = self.log_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let json = serde_json::to_string_pretty(log)
            .map_err(|e| write_error(std::io::Error::other(e)))?;
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json).map_err(write_error)?;
        if let Err(e) = fs::rename(&tmp_path, &self.log_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_error(e));
        }

        debug!(
            path = %self.log_path.display(),
            operations = log.operations.len(),
            "undo log written"
        );
        Ok(())
    }

    /// Loads the log, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::UndoLogRead` if the file cannot be read and
    /// `OrganizeError::UndoLogFormat` if it is not a valid log.
    pub fn load(&self) -> OrganizeResult<Option<UndoLog>> {
        if !self.log_path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&self.log_path).map_err(|e| OrganizeError::UndoLogRead {
                path: self.log_path.clone(),
                source: e,
            })?;
        let log: UndoLog =
            serde_json::from_str(&content).map_err(|e| OrganizeError::UndoLogFormat {
                path: self.log_path.clone(),
                reason: e.to_string(),
            })?;

        if log.version > UNDO_LOG_VERSION {
            return Err(OrganizeError::UndoLogFormat {
                path: self.log_path.clone(),
                reason: format!("unsupported log version {}", log.version),
            });
        }
        Ok(Some(log))
    }

    /// Deletes the log if present.
    pub fn clear(&self) -> OrganizeResult<()> {
        match fs::remove_file(&self.log_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OrganizeError::UndoLogWrite {
                path: self.log_path.clone(),
                source: e,
            }),
        }
    }

    /// Reverses the logged run.
    ///
    /// Operations are reversed newest first. A reversal needs the file at its
    /// recorded destination and a free original path; the original parent
    /// directory is recreated if it disappeared. Existing files are never
    /// overwritten. Afterwards, directories created by the run are removed if
    /// they are empty.
    ///
    /// Restored entries are consumed: when everything is restored the log is
    /// deleted, otherwise it is rewritten with only the failed entries.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::NoUndoAvailable` if there is no log or it has
    /// nothing left to undo.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirshift::filesystem::StdFileSystem;
    /// use dirshift::undo::UndoManager;
    ///
    /// let manager = UndoManager::new(UndoManager::default_log_path());
    /// match manager.undo(&StdFileSystem) {
    ///     Ok(results) => println!("Restored {} files", results.successful),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo<F: FileSystem + ?Sized>(&self, fs: &F) -> OrganizeResult<OperationResults> {
        let Some(log) = self.load()? else {
            return Err(OrganizeError::NoUndoAvailable);
        };
        if log.operations.is_empty() {
            self.clear()?;
            return Err(OrganizeError::NoUndoAvailable);
        }

        info!(
            target_dir = %log.target_dir.display(),
            operations = log.operations.len(),
            "undoing last run"
        );

        let mut results = OperationResults {
            candidates: log.operations.len(),
            ..Default::default()
        };
        let mut remaining = Vec::new();

        for operation in log.operations.iter().rev() {
            let mut reversal = operation.inverse();
            match restore(fs, &reversal) {
                Ok(()) => {
                    debug!(
                        from = %reversal.source.display(),
                        to = %reversal.destination.display(),
                        "restored"
                    );
                    reversal.executed = true;
                    results.successful += 1;
                }
                Err(e) => {
                    warn!(path = %reversal.source.display(), error = %e, "restore failed");
                    results.errors.push((reversal.source.clone(), e.to_string()));
                    remaining.push(operation.clone());
                }
            }
            results.operations.push(reversal);
        }

        remove_created_dirs(fs, &log.created_dirs);

        if remaining.is_empty() {
            self.clear()?;
        } else {
            remaining.reverse();
            let leftover = UndoLog {
                operations: remaining,
                ..log
            };
            self.record(&leftover)?;
        }

        info!(
            restored = results.successful,
            failed = results.errors.len(),
            "undo finished"
        );
        Ok(results)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.log_path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

/// Moves one file back along `reversal`.
fn restore<F: FileSystem + ?Sized>(fs: &F, reversal: &Operation) -> Result<(), FsError> {
    if !fs.exists(&reversal.source) {
        return Err(FsError::NotFound {
            path: reversal.source.clone(),
        });
    }
    if fs.exists(&reversal.destination) {
        return Err(FsError::AlreadyExists {
            path: reversal.destination.clone(),
        });
    }
    if let Some(parent) = reversal.destination.parent()
        && !parent.as_os_str().is_empty()
        && !fs.is_dir(parent)
    {
        fs.create_dir_all(parent)?;
    }
    fs.move_file(&reversal.source, &reversal.destination)
}

/// Removes the given directories, deepest first, when they are empty.
fn remove_created_dirs<F: FileSystem + ?Sized>(fs: &F, dirs: &[PathBuf]) {
    let mut ordered: Vec<&PathBuf> = dirs.iter().collect();
    ordered.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
    for dir in ordered {
        match fs.remove_empty_dir(dir) {
            Ok(true) => debug!(dir = %dir.display(), "removed created directory"),
            Ok(false) => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "could not remove directory"),
        }
    }
}
