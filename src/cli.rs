//! Command-line interface.
//!
//! Parses arguments with `clap`, turns them into a run [`Config`], and wires
//! settings, the orchestrator and the report output together.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::{OrganizeError, OrganizeResult};
use crate::orchestrator::{Action, Config, Orchestrator};
use crate::organizer::{DateLayout, OrganizeMode};
use crate::output::{OutputFormatter, ProgressReporter};
use crate::renamer::{CaseStyle, RenameMode};
use crate::undo::UndoManager;

#[derive(Debug, Parser)]
#[command(
    name = "dirshift",
    version,
    about = "Organize and bulk-rename files, with dry runs and undo"
)]
pub struct Cli {
    /// Settings file (defaults to .dirshiftrc.toml, then ~/.config/dirshift/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Undo log location (defaults to ~/.dirshift/undo_log.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub undo_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Command::OrganizeType { common }
            | Command::OrganizeDate { common, .. }
            | Command::Rename { common, .. }
            | Command::Custom { common, .. } => common.verbose,
            Command::Undo { verbose } => *verbose,
        }
    }
}

/// Flags shared by every command that plans a run.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Directory to operate on
    #[arg(short = 'd', long, default_value = ".", value_name = "DIR")]
    pub target_dir: PathBuf,

    /// Glob selecting input files, relative to the target directory
    #[arg(short = 'p', long, default_value = "*")]
    pub pattern: String,

    /// Show the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// List every operation
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move files into folders by type (Documents, Images, ...)
    OrganizeType {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Move files into folders by modification date
    OrganizeDate {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_enum, default_value_t = DateFormat::Nested)]
        format: DateFormat,
    },
    /// Rename files in place
    Rename {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        options: RenameArgs,
    },
    /// Move files according to a YAML or JSON rules file
    Custom {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long, value_name = "FILE")]
        rules: PathBuf,
    },
    /// Revert the most recent run
    Undo {
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DateFormat {
    #[value(name = "YYYY/MM")]
    Nested,
    #[value(name = "YYYY-MM")]
    Flat,
}

impl From<DateFormat> for DateLayout {
    fn from(format: DateFormat) -> Self {
        match format {
            DateFormat::Nested => DateLayout::Nested,
            DateFormat::Flat => DateLayout::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaseArg {
    Lowercase,
    Uppercase,
    Title,
}

impl From<CaseArg> for CaseStyle {
    fn from(case: CaseArg) -> Self {
        match case {
            CaseArg::Lowercase => CaseStyle::Lower,
            CaseArg::Uppercase => CaseStyle::Upper,
            CaseArg::Title => CaseStyle::Title,
        }
    }
}

/// Rename methods. Exactly one must be chosen.
#[derive(Debug, Clone, Default, Args)]
pub struct RenameArgs {
    /// Text to find in each name (use with --replace)
    #[arg(long)]
    pub find: Option<String>,

    /// Replacement text (use with --find)
    #[arg(long)]
    pub replace: Option<String>,

    /// Numbered names from a template such as "photo_{n}"
    #[arg(long, value_name = "TEMPLATE")]
    pub sequential: Option<String>,

    #[arg(long, value_enum)]
    pub case: Option<CaseArg>,

    /// Text to put before each name
    #[arg(long)]
    pub prefix: Option<String>,

    /// Text to put before each extension
    #[arg(long)]
    pub suffix: Option<String>,
}

impl RenameArgs {
    /// Resolves the flags into a single rename mode.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidOptions` unless exactly one method is
    /// selected with everything it needs.
    pub fn into_mode(self) -> OrganizeResult<RenameMode> {
        let invalid = |msg: &str| OrganizeError::InvalidOptions(msg.to_string());

        let find_replace = self.find.is_some() || self.replace.is_some();
        let affix = self.prefix.is_some() || self.suffix.is_some();
        let chosen = [
            find_replace,
            self.sequential.is_some(),
            self.case.is_some(),
            affix,
        ]
        .iter()
        .filter(|chosen| **chosen)
        .count();

        if chosen == 0 {
            return Err(invalid(
                "choose a rename method: --find/--replace, --sequential, --case or --prefix/--suffix",
            ));
        }
        if chosen > 1 {
            return Err(invalid("only one rename method can be used at a time"));
        }

        let mode = if find_replace {
            match (self.find, self.replace) {
                (Some(find), Some(replace)) => RenameMode::FindReplace { find, replace },
                (Some(_), None) => return Err(invalid("--find requires --replace")),
                _ => return Err(invalid("--replace requires --find")),
            }
        } else if let Some(template) = self.sequential {
            RenameMode::Sequential { template }
        } else if let Some(case) = self.case {
            RenameMode::Case(case.into())
        } else {
            RenameMode::Affix {
                prefix: self.prefix.unwrap_or_default(),
                suffix: self.suffix.unwrap_or_default(),
            }
        };

        mode.validate().map_err(OrganizeError::InvalidOptions)?;
        Ok(mode)
    }
}

impl Command {
    /// Builds the run config. `None` for `undo`.
    pub fn to_config(&self) -> OrganizeResult<Option<Config>> {
        let (common, action) = match self {
            Command::OrganizeType { common } => (common, Action::Organize(OrganizeMode::ByType)),
            Command::OrganizeDate { common, format } => (
                common,
                Action::Organize(OrganizeMode::ByDate((*format).into())),
            ),
            Command::Rename { common, options } => {
                (common, Action::Rename(options.clone().into_mode()?))
            }
            Command::Custom { common, rules } => {
                (common, Action::Organize(OrganizeMode::ByRules(rules.clone())))
            }
            Command::Undo { .. } => return Ok(None),
        };

        Ok(Some(Config {
            target_dir: common.target_dir.clone(),
            file_pattern: common.pattern.clone(),
            dry_run: common.dry_run,
            verbose: common.verbose,
            action,
        }))
    }
}

/// Runs a parsed command line.
///
/// # Errors
///
/// Returns an error for invalid options, unusable settings, precondition
/// failures, an undo log that could not be written after the run, and `undo`
/// without a log. Per-file failures are reported, not returned.
pub fn run(cli: Cli) -> OrganizeResult<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let log_path = cli
        .undo_log
        .clone()
        .unwrap_or_else(|| settings.undo_log_path());
    let undo = UndoManager::new(log_path);

    let Some(config) = cli.command.to_config()? else {
        return run_undo(undo, cli.verbose());
    };

    let filters = settings.compile_filters()?;
    let orchestrator = Orchestrator::new(undo).with_filters(filters);

    OutputFormatter::info(&format!(
        "Processing {} (pattern '{}')",
        config.target_dir.display(),
        config.file_pattern
    ));
    let mut progress = ProgressReporter::new();
    let mut report = orchestrator.run(&config, &mut progress)?;
    OutputFormatter::print_run(&report, &report.target_dir, config.verbose);
    match report.log_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run_undo(undo: UndoManager, verbose: bool) -> OrganizeResult<()> {
    OutputFormatter::info("Undoing previous run...");
    let results = Orchestrator::new(undo).undo()?;

    if verbose {
        for op in &results.operations {
            let mark = if op.executed { "✓" } else { "✗" };
            println!(
                " {} {} → {}",
                mark,
                op.source.display(),
                op.destination.display()
            );
        }
    }
    OutputFormatter::print_results(&results);
    if results.has_errors() {
        OutputFormatter::warning(
            "Some files could not be restored. Fix the problems above and run undo again.",
        );
    } else {
        OutputFormatter::success("Undo complete");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dirshift").chain(args.iter().copied())).unwrap()
    }

    fn rename_mode(args: &[&str]) -> OrganizeResult<RenameMode> {
        let mut full = vec!["rename"];
        full.extend_from_slice(args);
        match parse(&full).command {
            Command::Rename { options, .. } => options.into_mode(),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_common_defaults() {
        let cli = parse(&["organize-type"]);
        let config = cli.command.to_config().unwrap().unwrap();
        assert_eq!(config.target_dir, PathBuf::from("."));
        assert_eq!(config.file_pattern, "*");
        assert!(!config.dry_run);
        assert_eq!(config.action, Action::Organize(OrganizeMode::ByType));
    }

    #[test]
    fn test_date_format_values() {
        let cli = parse(&["organize-date", "-d", "/tmp/x", "--format", "YYYY-MM", "--dry-run"]);
        let config = cli.command.to_config().unwrap().unwrap();
        assert_eq!(
            config.action,
            Action::Organize(OrganizeMode::ByDate(DateLayout::Flat))
        );
        assert!(config.dry_run);

        let nested = parse(&["organize-date"]).command.to_config().unwrap().unwrap();
        assert_eq!(
            nested.action,
            Action::Organize(OrganizeMode::ByDate(DateLayout::Nested))
        );

        let bad = Cli::try_parse_from(["dirshift", "organize-date", "--format", "YYYY"]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_rename_requires_exactly_one_method() {
        assert!(matches!(rename_mode(&[]), Err(OrganizeError::InvalidOptions(_))));
        assert!(matches!(
            rename_mode(&["--case", "lowercase", "--prefix", "x_"]),
            Err(OrganizeError::InvalidOptions(_))
        ));
        assert_eq!(
            rename_mode(&["--case", "title"]).unwrap(),
            RenameMode::Case(CaseStyle::Title)
        );
    }

    #[test]
    fn test_find_and_replace_must_be_paired() {
        assert!(matches!(
            rename_mode(&["--find", "a"]),
            Err(OrganizeError::InvalidOptions(_))
        ));
        assert!(matches!(
            rename_mode(&["--replace", "b"]),
            Err(OrganizeError::InvalidOptions(_))
        ));
        assert_eq!(
            rename_mode(&["--find", "IMG", "--replace", ""]).unwrap(),
            RenameMode::FindReplace {
                find: "IMG".to_string(),
                replace: String::new()
            }
        );
    }

    #[test]
    fn test_prefix_alone_is_enough() {
        assert_eq!(
            rename_mode(&["--prefix", "2024_"]).unwrap(),
            RenameMode::Affix {
                prefix: "2024_".to_string(),
                suffix: String::new()
            }
        );
    }

    #[test]
    fn test_global_flags_and_undo() {
        let cli = parse(&["undo", "-v", "--undo-log", "/tmp/log.json"]);
        assert!(cli.verbose());
        assert_eq!(cli.undo_log, Some(PathBuf::from("/tmp/log.json")));
        assert!(cli.command.to_config().unwrap().is_none());
    }
}
