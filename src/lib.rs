//! dirshift - bulk, reversible file organization and renaming
//!
//! A run is planned first, previewed or executed file by file, and recorded in
//! an undo log so the most recent run can be reverted. Files can be organized
//! by type, by date or by custom rules, or renamed in place.

pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod filesystem;
pub mod logging;
pub mod operation;
pub mod orchestrator;
pub mod organizer;
pub mod output;
pub mod renamer;
pub mod rule_engine;
pub mod undo;

pub use config::{CompiledFilters, Settings};
pub use error::{FsError, OrganizeError, OrganizeResult, RuleValidationError};
pub use file_category::{Category, FileMapper};
pub use filesystem::{FileSystem, StdFileSystem};
pub use operation::{Operation, OperationKind, OperationResults, Plan};
pub use orchestrator::{Action, Config, NoProgress, Orchestrator, ProgressSink, RunReport};
pub use organizer::{DateLayout, OrganizeMode};
pub use renamer::{CaseStyle, RenameMode};
pub use undo::{UndoLog, UndoManager};
