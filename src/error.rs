//! Error types shared across the dirshift pipeline.
//!
//! Errors are split by the level at which they are handled:
//! - [`FsError`]: a single filesystem primitive failed; recorded per file.
//! - [`RuleValidationError`] and [`RenameError`]: one offending item; reported and skipped.
//! - [`OrganizeError`]: a precondition failed; the whole invocation aborts.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for filesystem gateway calls.
pub type FsResult<T> = Result<T, FsError>;

/// Result type for whole-invocation operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Failures reported by the filesystem gateway.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("{} does not exist", .path.display())]
    NotFound { path: PathBuf },
    #[error("permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },
    #[error("{} already exists", .path.display())]
    AlreadyExists { path: PathBuf },
    #[error("no space left on device while writing {}", .path.display())]
    StorageFull { path: PathBuf },
    #[error("path name too long: {}", .path.display())]
    NameTooLong { path: PathBuf },
    #[error("invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("{operation} failed for {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl FsError {
    /// Classifies an IO error raised by `operation` on `path`.
    pub fn from_io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            io::ErrorKind::StorageFull => Self::StorageFull { path },
            io::ErrorKind::InvalidFilename => Self::NameTooLong { path },
            _ => Self::Io {
                operation,
                path,
                source,
            },
        }
    }
}

/// Problems with the rules file as a whole. These abort a custom-rule run.
#[derive(Debug, Error)]
pub enum RulesFileError {
    #[error("cannot read rules file {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("unsupported rules file format '{extension}' (use .yaml, .yml or .json)")]
    UnsupportedFormat { extension: String },
    #[error("cannot parse rules file {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("rules file {} must contain a 'rules' list", .path.display())]
    MissingRules { path: PathBuf },
}

/// A single malformed rule. The remaining rules still compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rule {index}{}: {reason}", .name.as_deref().map(|n| format!(" ('{n}')")).unwrap_or_default())]
pub struct RuleValidationError {
    /// Position of the rule in the rules file.
    pub index: usize,
    /// Rule name, when one could be read.
    pub name: Option<String>,
    pub reason: String,
}

/// A rename transform could not produce a usable file name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("rename of '{original}' would produce an empty file name")]
    EmptyName { original: String },
    #[error("rename of '{original}' would produce '{proposed}', which contains a path separator")]
    PathSeparator { original: String, proposed: String },
}

/// Errors from loading or compiling the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read configuration {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid glob pattern '{0}' in filters")]
    InvalidGlobPattern(String),
    #[error("invalid regex pattern '{pattern}' in filters: {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
}

/// Failures that abort an invocation before (or instead of) touching files.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("target directory {} is missing or not a directory", .0.display())]
    TargetUnavailable(PathBuf),
    #[error("cannot list files in {}: {source}", .path.display())]
    Listing { path: PathBuf, source: FsError },
    #[error(transparent)]
    RulesFile(#[from] RulesFileError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("no recent operations to undo")]
    NoUndoAvailable,
    #[error("cannot read undo log {}: {source}", .path.display())]
    UndoLogRead { path: PathBuf, source: io::Error },
    #[error("cannot write undo log {}: {source}", .path.display())]
    UndoLogWrite { path: PathBuf, source: io::Error },
    #[error("undo log {} is corrupted: {reason}", .path.display())]
    UndoLogFormat { path: PathBuf, reason: String },
}
