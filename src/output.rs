//! Output formatting and styling.
//!
//! All user-facing report output goes through [`OutputFormatter`]; execution
//! progress is drawn by [`ProgressReporter`]. Diagnostics go through `tracing`
//! instead.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::RuleValidationError;
use crate::operation::{Operation, OperationResults, Plan};
use crate::orchestrator::{ProgressSink, RunReport};

/// Prints reports with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirshift::output::OutputFormatter;
    /// OutputFormatter::success("Undo complete");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message to stderr in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Progress bar for `total` operations.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints the outcome of a run: the plan for a dry run, counts and errors
    /// otherwise. `verbose` lists every operation.
    pub fn print_run(report: &RunReport, target: &Path, verbose: bool) {
        Self::print_validation_errors(&report.plan.validation_errors);

        if report.dry_run {
            Self::print_plan(&report.plan, target);
            Self::summary_table(&bucket_counts(&report.plan.operations, target), report.plan.len());
            Self::dry_run_notice(&format!(
                "{} operation(s) would be performed. No files were modified.",
                report.results.successful
            ));
            return;
        }

        if verbose {
            Self::print_operations(&report.results.operations, target);
        }
        Self::print_results(&report.results);
        if report.log_written {
            Self::info("Run 'dirshift undo' to revert these changes.");
        } else if report.log_error.is_some() {
            Self::warning("The changes above were made but could not be recorded for undo.");
        }
    }

    /// Prints the ordered plan.
    pub fn print_plan(plan: &Plan, target: &Path) {
        if plan.is_empty() {
            Self::info("Nothing to do.");
            return;
        }
        Self::header("PLAN");
        for (index, op) in plan.operations.iter().enumerate() {
            println!(
                "{:>4}. {} {} → {}",
                index + 1,
                op.kind.to_string().cyan(),
                relative(&op.source, target).display(),
                relative(&op.destination, target).display()
            );
        }
        for skip in &plan.skipped {
            println!(
                "      {} {} ({})",
                "SKIP".dimmed(),
                relative(&skip.path, target).display(),
                skip.reason
            );
        }
        for (path, reason) in &plan.rejected {
            println!(
                "      {} {}: {}",
                "FAIL".red(),
                relative(path, target).display(),
                reason
            );
        }
    }

    /// Prints every operation with its outcome.
    pub fn print_operations(operations: &[Operation], target: &Path) {
        for op in operations {
            let mark = if op.executed { "✓".green() } else { "✗".red() };
            println!(
                " {} {} {} → {}",
                mark,
                op.kind,
                relative(&op.source, target).display(),
                relative(&op.destination, target).display()
            );
        }
    }

    /// Prints the counts and the ordered error list.
    pub fn print_results(results: &OperationResults) {
        Self::header("RESULTS");
        println!("  Successful: {}", results.successful.to_string().green());
        println!("  Skipped:    {}", results.skipped);
        let failed = results.errors.len();
        if failed == 0 {
            println!("  Errors:     0");
            return;
        }
        println!("  Errors:     {}", failed.to_string().red());
        for (path, message) in &results.errors {
            eprintln!("    - {}: {}", path.display(), message);
        }
    }

    pub fn print_validation_errors(errors: &[RuleValidationError]) {
        if errors.is_empty() {
            return;
        }
        Self::warning(&format!("{} invalid rule(s) ignored:", errors.len()));
        for error in errors {
            println!("    - {}", error);
        }
    }

    /// Prints a table of planned files per destination directory.
    pub fn summary_table(counts: &BTreeMap<String, usize>, total_files: usize) {
        if counts.is_empty() {
            return;
        }
        Self::header("SUMMARY");

        let width = counts
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0)
            .max(11); // "Destination"

        println!(
            "{:<width$} | {}",
            "Destination".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));
        for (dir, count) in counts {
            let file_word = if *count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                dir,
                count.to_string().green(),
                file_word,
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            if total_files == 1 { "file" } else { "files" },
            width = width
        );
    }
}

/// Number of operations per destination directory, relative to `target`.
pub fn bucket_counts(operations: &[Operation], target: &Path) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for op in operations {
        let dir = op
            .destination
            .parent()
            .map(|p| relative(p, target))
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        *counts.entry(dir).or_insert(0) += 1;
    }
    counts
}

fn relative(path: &Path, target: &Path) -> PathBuf {
    path.strip_prefix(target)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Drives an `indicatif` progress bar from execution events.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self { bar: None }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ProgressReporter {
    fn start(&mut self, total: usize) {
        if total > 0 {
            self.bar = Some(OutputFormatter::create_progress_bar(total as u64));
        }
    }

    fn operation_done(&mut self, operation: &Operation, _error: Option<&str>) {
        if let Some(bar) = &self.bar {
            if let Some(name) = operation.source.file_name() {
                bar.set_message(name.to_string_lossy().into_owned());
            }
            bar.inc(1);
        }
    }

    fn finish(&mut self, _results: &OperationResults) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;

    #[test]
    fn test_bucket_counts_groups_by_destination_dir() {
        let target = Path::new("/t");
        let ops = vec![
            Operation::new(OperationKind::Move, "/t/a.pdf".into(), "/t/Documents/a.pdf".into()),
            Operation::new(OperationKind::Move, "/t/b.pdf".into(), "/t/Documents/b.pdf".into()),
            Operation::new(OperationKind::Move, "/t/c.jpg".into(), "/t/2024/03/c.jpg".into()),
            Operation::new(OperationKind::Rename, "/t/d.txt".into(), "/t/e.txt".into()),
        ];

        let counts = bucket_counts(&ops, target);
        assert_eq!(counts.get("Documents"), Some(&2));
        assert_eq!(counts.get("2024/03"), Some(&1));
        assert_eq!(counts.get("."), Some(&1));
    }

    #[test]
    fn test_relative_falls_back_to_full_path() {
        assert_eq!(relative(Path::new("/t/a/b"), Path::new("/t")), PathBuf::from("a/b"));
        assert_eq!(relative(Path::new("/x/y"), Path::new("/t")), PathBuf::from("/x/y"));
    }

    #[test]
    fn test_progress_reporter_without_operations_has_no_bar() {
        let mut reporter = ProgressReporter::new();
        reporter.start(0);
        assert!(reporter.bar.is_none());
        reporter.finish(&OperationResults::default());
    }
}
