//! Operations, plans and results exchanged between the pipeline stages.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RuleValidationError;

/// Whether an operation relocates a file or changes its name in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Move,
    Rename,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Move => write!(f, "MOVE"),
            OperationKind::Rename => write!(f, "RENAME"),
        }
    }
}

/// A single planned (and possibly executed) move or rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    /// Path of the file before the operation.
    pub source: PathBuf,
    /// Path of the file after the operation.
    pub destination: PathBuf,
    /// When the operation was planned.
    pub timestamp: DateTime<Utc>,
    /// Set once the filesystem confirmed the operation.
    #[serde(default)]
    pub executed: bool,
}

impl Operation {
    pub fn new(kind: OperationKind, source: PathBuf, destination: PathBuf) -> Self {
        Self {
            kind,
            source,
            destination,
            timestamp: Utc::now(),
            executed: false,
        }
    }

    /// The operation that puts the file back where it came from.
    pub fn inverse(&self) -> Self {
        Self {
            kind: self.kind,
            source: self.destination.clone(),
            destination: self.source.clone(),
            timestamp: Utc::now(),
            executed: false,
        }
    }
}

/// A file that was considered but will not be touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRecord {
    pub path: PathBuf,
    pub reason: String,
}

impl SkipRecord {
    pub fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// The ordered result of planning and conflict resolution.
///
/// Every candidate file ends up in exactly one of `operations`, `skipped` or
/// `rejected`.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub operations: Vec<Operation>,
    pub skipped: Vec<SkipRecord>,
    /// Files that could not be planned, with the reason. Includes naming conflicts.
    pub rejected: Vec<(PathBuf, String)>,
    /// Malformed rules from a custom rules file.
    pub validation_errors: Vec<RuleValidationError>,
    /// Number of files enumerated and kept by the filters.
    pub candidates: usize,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Results for a dry run: every planned operation counts as one that would succeed.
    pub fn preview_results(&self) -> OperationResults {
        OperationResults {
            successful: self.operations.len(),
            skipped: self.skipped.len(),
            errors: self.rejected.clone(),
            operations: self.operations.clone(),
            candidates: self.candidates,
        }
    }
}

/// Aggregated outcome of executing (or undoing) a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResults {
    pub successful: usize,
    pub skipped: usize,
    /// Failed files in the order they were attempted.
    pub errors: Vec<(PathBuf, String)>,
    /// Operations attempted, with `executed` reflecting the outcome.
    pub operations: Vec<Operation>,
    /// Total files considered.
    pub candidates: usize,
}

impl OperationResults {
    /// Returns the number of files accounted for.
    pub fn total_processed(&self) -> usize {
        self.successful + self.skipped + self.errors.len()
    }

    /// True when every considered file is accounted for exactly once.
    pub fn is_consistent(&self) -> bool {
        self.total_processed() == self.candidates
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
