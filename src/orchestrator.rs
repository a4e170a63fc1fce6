//! Planning, conflict resolution, execution and undo logging.
//!
//! A run moves through these phases:
//!
//! ```text
//! Planning -> ConflictResolution -> (DryRunReport | Executing) -> Logging -> Done
//! ```
//!
//! and ends in `Aborted` if a precondition fails (missing target, invalid
//! input pattern, unreadable rules file). Nothing below precondition level
//! stops a run: per-file problems are recorded and the rest continues.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::CompiledFilters;
use crate::error::{OrganizeError, OrganizeResult};
use crate::file_category::FileMapper;
use crate::filesystem::{FileSystem, StdFileSystem};
use crate::operation::{Operation, OperationKind, OperationResults, Plan, SkipRecord};
use crate::organizer::{self, OrganizeMode};
use crate::renamer::{RenameMode, split_name};
use crate::rule_engine::{self, RuleMatcher};
use crate::undo::{UndoLog, UndoManager};

/// What a run does to each candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Rename(RenameMode),
    Organize(OrganizeMode),
}

impl Action {
    fn kind(&self) -> OperationKind {
        match self {
            Action::Rename(_) => OperationKind::Rename,
            Action::Organize(_) => OperationKind::Move,
        }
    }
}

/// Options for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub target_dir: PathBuf,
    /// Glob relative to `target_dir` selecting the input files.
    pub file_pattern: String,
    pub dry_run: bool,
    pub verbose: bool,
    pub action: Action,
}

impl Config {
    /// A config for `action` on every top-level file of `target_dir`.
    pub fn new(target_dir: impl Into<PathBuf>, action: Action) -> Self {
        Self {
            target_dir: target_dir.into(),
            file_pattern: "*".to_string(),
            dry_run: false,
            verbose: false,
            action,
        }
    }
}

/// Pipeline phase, traced at debug level on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    ConflictResolution,
    DryRunReport,
    Executing,
    Logging,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Planning => "planning",
            Phase::ConflictResolution => "conflict resolution",
            Phase::DryRunReport => "dry run report",
            Phase::Executing => "executing",
            Phase::Logging => "logging",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

fn enter(phase: Phase) {
    debug!(%phase, "entering phase");
}

/// Observer for execution progress.
pub trait ProgressSink {
    fn start(&mut self, _total: usize) {}

    /// Called after each operation; `error` is set when it failed.
    fn operation_done(&mut self, _operation: &Operation, _error: Option<&str>) {}

    fn finish(&mut self, _results: &OperationResults) {}
}

/// A [`ProgressSink`] that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Everything a caller needs to report on a finished run.
#[derive(Debug)]
pub struct RunReport {
    /// Absolute form of the configured target directory.
    pub target_dir: PathBuf,
    pub plan: Plan,
    pub results: OperationResults,
    pub dry_run: bool,
    /// Whether the undo log was replaced by this run.
    pub log_written: bool,
    /// Set when files were changed but the undo log could not be written.
    pub log_error: Option<OrganizeError>,
}

/// Outcome of [`Orchestrator::execute`].
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub results: OperationResults,
    /// Directories created during execution, parents before children.
    pub created_dirs: Vec<PathBuf>,
}

/// Drives a run against a [`FileSystem`].
pub struct Orchestrator<F: FileSystem = StdFileSystem> {
    fs: F,
    undo: UndoManager,
    filters: CompiledFilters,
    mapper: FileMapper,
}

impl Orchestrator<StdFileSystem> {
    /// An orchestrator over the local disk using `undo` for the undo log.
    pub fn new(undo: UndoManager) -> Self {
        Self::with_file_system(StdFileSystem, undo)
    }
}

impl<F: FileSystem> Orchestrator<F> {
    pub fn with_file_system(fs: F, undo: UndoManager) -> Self {
        Self {
            fs,
            undo,
            filters: CompiledFilters::default(),
            mapper: FileMapper::default(),
        }
    }

    /// Replaces the candidate filters (hidden files only, by default).
    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    /// Plans, then either previews or executes and logs.
    ///
    /// # Errors
    ///
    /// Returns an error on a precondition failure, in which case nothing was
    /// touched. A failed undo log write after execution is carried in
    /// [`RunReport::log_error`] so the results are not lost.
    pub fn run(&self, config: &Config, sink: &mut dyn ProgressSink) -> OrganizeResult<RunReport> {
        let plan = match self.plan(config) {
            Ok(plan) => plan,
            Err(e) => {
                enter(Phase::Aborted);
                warn!(error = %e, "run aborted");
                return Err(e);
            }
        };

        if config.dry_run {
            enter(Phase::DryRunReport);
            let results = plan.preview_results();
            info!(planned = plan.len(), "dry run, nothing changed");
            enter(Phase::Done);
            return Ok(RunReport {
                target_dir: absolute(&config.target_dir),
                plan,
                results,
                dry_run: true,
                log_written: false,
                log_error: None,
            });
        }

        let execution = self.execute(&plan, sink);

        enter(Phase::Logging);
        let executed: Vec<Operation> = execution
            .results
            .operations
            .iter()
            .filter(|op| op.executed)
            .cloned()
            .collect();
        let target_dir = absolute(&config.target_dir);
        let mut log_written = false;
        let mut log_error = None;
        if !executed.is_empty() {
            let log = UndoLog::new(target_dir.clone(), executed, execution.created_dirs);
            match self.undo.record(&log) {
                Ok(()) => log_written = true,
                Err(e) => {
                    warn!(error = %e, "files were changed but the undo log was not written");
                    log_error = Some(e);
                }
            }
        }

        enter(Phase::Done);
        info!(
            successful = execution.results.successful,
            skipped = execution.results.skipped,
            errors = execution.results.errors.len(),
            "run finished"
        );
        Ok(RunReport {
            target_dir,
            plan,
            results: execution.results,
            dry_run: false,
            log_written,
            log_error,
        })
    }

    /// Builds the ordered, conflict-free plan for `config` without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is not a directory, the input pattern is
    /// invalid, or the rules file cannot be used.
    pub fn plan(&self, config: &Config) -> OrganizeResult<Plan> {
        enter(Phase::Planning);
        // every planned and logged path is absolute, so undo works from any cwd
        let target = absolute(&config.target_dir);
        let target = target.as_path();
        if !self.fs.is_dir(target) {
            return Err(OrganizeError::TargetUnavailable(config.target_dir.clone()));
        }

        let mut plan = Plan::default();
        let matcher = match &config.action {
            Action::Organize(OrganizeMode::ByRules(rules_path)) => {
                let specs = rule_engine::load_rules(rules_path)?;
                let compiled = rule_engine::compile(&specs);
                plan.validation_errors = compiled.errors;
                info!(
                    valid = compiled.matcher.len(),
                    invalid = plan.validation_errors.len(),
                    "rules compiled"
                );
                Some(compiled.matcher)
            }
            _ => None,
        };

        let candidates = self.candidates(target, &config.file_pattern)?;
        plan.candidates = candidates.len();
        debug!(count = candidates.len(), "candidates selected");

        let mut proposals = Vec::with_capacity(candidates.len());
        for (index, source) in candidates.into_iter().enumerate() {
            match self.route(target, &config.action, matcher.as_ref(), &source, index + 1) {
                Route::To(destination) => proposals.push((source, destination)),
                Route::Skip(reason) => plan.skipped.push(SkipRecord::new(&source, reason)),
                Route::Reject(reason) => {
                    warn!(path = %source.display(), %reason, "cannot plan file");
                    plan.rejected.push((source, reason));
                }
            }
        }

        enter(Phase::ConflictResolution);
        self.resolve_conflicts(config.action.kind(), proposals, &mut plan);
        debug!(
            operations = plan.len(),
            skipped = plan.skipped.len(),
            rejected = plan.rejected.len(),
            "plan ready"
        );
        Ok(plan)
    }

    /// Applies `plan` in order, isolating failures to the file they happen on.
    pub fn execute(&self, plan: &Plan, sink: &mut dyn ProgressSink) -> Execution {
        enter(Phase::Executing);
        sink.start(plan.len());

        let mut results = OperationResults {
            skipped: plan.skipped.len(),
            errors: plan.rejected.clone(),
            candidates: plan.candidates,
            ..Default::default()
        };
        let mut created_dirs = Vec::new();
        let mut ready_dirs: HashSet<PathBuf> = HashSet::new();

        for planned in &plan.operations {
            let mut operation = planned.clone();
            let outcome = self
                .ensure_parent(&operation.destination, &mut ready_dirs, &mut created_dirs)
                .and_then(|()| {
                    self.fs
                        .move_file(&operation.source, &operation.destination)
                        .map_err(|e| e.to_string())
                });

            match &outcome {
                Ok(()) => {
                    debug!(
                        kind = %operation.kind,
                        from = %operation.source.display(),
                        to = %operation.destination.display(),
                        "operation executed"
                    );
                    operation.executed = true;
                    results.successful += 1;
                }
                Err(message) => {
                    warn!(path = %operation.source.display(), error = %message, "operation failed");
                    results
                        .errors
                        .push((operation.source.clone(), message.clone()));
                }
            }
            sink.operation_done(&operation, outcome.as_ref().err().map(String::as_str));
            results.operations.push(operation);
        }

        sink.finish(&results);
        Execution {
            results,
            created_dirs,
        }
    }

    /// Reverts the most recent logged run.
    pub fn undo(&self) -> OrganizeResult<OperationResults> {
        self.undo.undo(&self.fs)
    }

    fn candidates(&self, target: &Path, pattern: &str) -> OrganizeResult<Vec<PathBuf>> {
        let files = self
            .fs
            .list_files(target, pattern)
            .map_err(|e| OrganizeError::Listing {
                path: target.to_path_buf(),
                source: e,
            })?;

        let log_path = absolute(self.undo.log_path());
        Ok(files
            .into_iter()
            .filter(|path| {
                let relative = path.strip_prefix(target).unwrap_or(path.as_path());
                self.filters.should_include(relative) && absolute(path) != log_path
            })
            .collect())
    }

    fn route(
        &self,
        target: &Path,
        action: &Action,
        matcher: Option<&RuleMatcher>,
        source: &Path,
        sequence: usize,
    ) -> Route {
        let Some(file_name) = source.file_name().and_then(|n| n.to_str()) else {
            return Route::Reject("file name is not valid UTF-8".to_string());
        };

        let bucket = match action {
            Action::Rename(mode) => {
                return match mode.apply(file_name, sequence) {
                    Ok(new_name) => Route::To(source.with_file_name(new_name)),
                    Err(e) => Route::Reject(e.to_string()),
                };
            }
            Action::Organize(OrganizeMode::ByType) => organizer::type_bucket(&self.mapper, source),
            Action::Organize(OrganizeMode::ByDate(layout)) => {
                let times = match self.fs.file_times(source) {
                    Ok(times) => Some(times),
                    Err(e) => {
                        warn!(path = %source.display(), error = %e, "cannot read file times");
                        None
                    }
                };
                organizer::date_bucket(times.as_ref(), *layout)
            }
            Action::Organize(OrganizeMode::ByRules(_)) => {
                let rule = matcher.and_then(|m| organizer::rule_bucket(m, source));
                match rule {
                    Some(rule) => {
                        debug!(path = %source.display(), rule = %rule.name, "rule matched");
                        rule.destination.clone()
                    }
                    None => return Route::Skip("no rule matched".to_string()),
                }
            }
        };

        match organizer::destination_in(target, &bucket, source) {
            Some(destination) => Route::To(destination),
            None => Route::Reject("path has no file name".to_string()),
        }
    }

    /// Drops no-ops, rejects colliding rename batches and suffixes the rest so
    /// that no destination is claimed twice or already taken on disk.
    fn resolve_conflicts(
        &self,
        kind: OperationKind,
        proposals: Vec<(PathBuf, PathBuf)>,
        plan: &mut Plan,
    ) {
        if kind == OperationKind::Rename {
            let collisions = rename_collisions(&proposals);
            if !collisions.is_empty() {
                warn!(
                    colliding = collisions.len(),
                    "rename batch rejected, several files would get the same name"
                );
                for (source, destination) in proposals {
                    match collisions.get(&destination) {
                        Some(count) => plan.rejected.push((
                            source,
                            format!(
                                "naming conflict: {count} files would be renamed to {}",
                                destination.display()
                            ),
                        )),
                        None => plan.skipped.push(SkipRecord::new(
                            &source,
                            "rename batch rejected because of naming conflicts",
                        )),
                    }
                }
                return;
            }
        }

        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for (source, destination) in proposals {
            if source == destination {
                plan.skipped.push(SkipRecord::new(&source, "already in place"));
                continue;
            }
            let destination = self.free_destination(destination, &claimed);
            claimed.insert(destination.clone());
            plan.operations.push(Operation::new(kind, source, destination));
        }
    }

    /// `destination`, or `stem_N.ext` with the smallest free `N`.
    fn free_destination(&self, destination: PathBuf, claimed: &HashSet<PathBuf>) -> PathBuf {
        let taken = |path: &Path| claimed.contains(path) || self.fs.exists(path);
        if !taken(&destination) {
            return destination;
        }

        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, extension) = split_name(&name);
        let mut n = 1usize;
        loop {
            let candidate = destination.with_file_name(format!("{stem}_{n}{extension}"));
            if !taken(&candidate) {
                debug!(
                    wanted = %destination.display(),
                    chosen = %candidate.display(),
                    "destination taken, using suffix"
                );
                return candidate;
            }
            n += 1;
        }
    }

    /// Makes sure the parent of `destination` exists, creating it at most once
    /// and remembering every directory that did not exist before.
    fn ensure_parent(
        &self,
        destination: &Path,
        ready: &mut HashSet<PathBuf>,
        created: &mut Vec<PathBuf>,
    ) -> Result<(), String> {
        let Some(parent) = destination.parent() else {
            return Ok(());
        };
        if ready.contains(parent) {
            return Ok(());
        }

        let missing: Vec<PathBuf> = parent
            .ancestors()
            .take_while(|dir| !dir.as_os_str().is_empty() && !self.fs.is_dir(dir))
            .map(Path::to_path_buf)
            .collect();
        if !missing.is_empty() {
            self.fs.create_dir_all(parent).map_err(|e| e.to_string())?;
            debug!(dir = %parent.display(), "created directory");
            created.extend(missing.into_iter().rev());
        }
        ready.insert(parent.to_path_buf());
        Ok(())
    }
}

enum Route {
    To(PathBuf),
    Skip(String),
    Reject(String),
}

/// Destinations produced by more than one input, with their counts.
fn rename_collisions(proposals: &[(PathBuf, PathBuf)]) -> HashMap<PathBuf, usize> {
    let mut counts: HashMap<PathBuf, usize> = HashMap::new();
    for (_, destination) in proposals {
        *counts.entry(destination.clone()).or_default() += 1;
    }
    counts.retain(|_, count| *count > 1);
    counts
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
