//! Custom organization rules.
//!
//! A rules file (YAML or JSON) holds a `rules` list:
//!
//! ```yaml
//! rules:
//!   - name: screenshots
//!     pattern: "Screenshot*.png"
//!     destination: Pictures/Screenshots
//!     priority: 1
//!   - name: invoices
//!     pattern: "regex:^INV-[0-9]+"
//!     destination: Finance/Invoices
//!     priority: 2
//! ```
//!
//! Patterns are globs matched against the file's base name unless prefixed
//! with [`REGEX_MARKER`]. Rules are evaluated by ascending priority, ties
//! broken by declaration order, and the first match wins. Malformed entries
//! are reported individually and left out; the rest still apply.

use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RuleValidationError, RulesFileError};

/// Prefix that switches a pattern from glob to regular-expression mode.
pub const REGEX_MARKER: &str = "regex:";

const NAME_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A validated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub pattern: String,
    /// Directory relative to the target directory.
    pub destination: PathBuf,
    /// Lower numbers win.
    pub priority: i64,
}

/// One rules-file entry as written, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    /// Set when the entry could not be decoded at all.
    #[serde(skip)]
    pub malformed: Option<String>,
}

impl RuleSpec {
    pub fn new(name: &str, pattern: &str, destination: &str, priority: i64) -> Self {
        Self {
            name: Some(name.to_string()),
            pattern: Some(pattern.to_string()),
            destination: Some(destination.to_string()),
            priority: Some(priority),
            malformed: None,
        }
    }

    fn from_value(value: Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        serde_json::from_value(value).unwrap_or_else(|e| RuleSpec {
            name,
            malformed: Some(e.to_string()),
            ..Default::default()
        })
    }
}

#[derive(Debug, Deserialize)]
struct RulesDocument {
    rules: Option<Vec<Value>>,
}

/// Reads and decodes a rules file. Each entry is decoded independently so a
/// single bad entry does not hide the others.
pub fn load_rules(path: &Path) -> Result<Vec<RuleSpec>, RulesFileError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !matches!(extension.as_str(), "yaml" | "yml" | "json") {
        return Err(RulesFileError::UnsupportedFormat { extension });
    }

    let content = fs::read_to_string(path).map_err(|e| RulesFileError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_rules(&content, &extension, path)
}

fn parse_rules(
    content: &str,
    extension: &str,
    path: &Path,
) -> Result<Vec<RuleSpec>, RulesFileError> {
    let parse_error = |reason: String| RulesFileError::Parse {
        path: path.to_path_buf(),
        reason,
    };
    let document: RulesDocument = if extension == "json" {
        serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?
    } else {
        serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?
    };

    let entries = document.rules.ok_or_else(|| RulesFileError::MissingRules {
        path: path.to_path_buf(),
    })?;
    debug!(path = %path.display(), count = entries.len(), "loaded rule entries");
    Ok(entries.into_iter().map(RuleSpec::from_value).collect())
}

#[derive(Debug, Clone)]
enum NameMatcher {
    Glob(Pattern),
    Regex(Regex),
}

impl NameMatcher {
    fn is_match(&self, file_name: &str) -> bool {
        match self {
            NameMatcher::Glob(pattern) => pattern.matches_with(file_name, NAME_MATCH_OPTIONS),
            NameMatcher::Regex(regex) => regex.is_match(file_name),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    declaration: usize,
    matcher: NameMatcher,
}

/// Valid rules in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct RuleMatcher {
    rules: Vec<CompiledRule>,
}

impl RuleMatcher {
    /// Returns the first rule, in priority order, whose pattern matches `file_name`.
    pub fn resolve(&self, file_name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|compiled| compiled.matcher.is_match(file_name))
            .map(|compiled| &compiled.rule)
    }

    /// Rules in the order they are evaluated.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Output of [`compile`]: the matcher over the valid subset plus one error per
/// rejected entry.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    pub matcher: RuleMatcher,
    pub errors: Vec<RuleValidationError>,
}

/// Validates every entry and builds the matcher from the valid ones.
pub fn compile(specs: &[RuleSpec]) -> CompiledRules {
    let mut compiled = Vec::new();
    let mut errors = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        match compile_one(index, spec) {
            Ok(rule) => compiled.push(rule),
            Err(error) => {
                warn!(%error, "ignoring invalid rule");
                errors.push(error);
            }
        }
    }

    compiled.sort_by_key(|c| (c.rule.priority, c.declaration));
    CompiledRules {
        matcher: RuleMatcher { rules: compiled },
        errors,
    }
}

fn compile_one(index: usize, spec: &RuleSpec) -> Result<CompiledRule, RuleValidationError> {
    let fail = |reason: String| RuleValidationError {
        index,
        name: spec.name.clone().filter(|n| !n.trim().is_empty()),
        reason,
    };

    if let Some(reason) = &spec.malformed {
        return Err(fail(format!("malformed entry: {reason}")));
    }

    let name = required(&spec.name, "name").map_err(&fail)?;
    let pattern = required(&spec.pattern, "pattern").map_err(&fail)?;
    let destination = required(&spec.destination, "destination").map_err(&fail)?;
    let destination = validate_destination(destination).map_err(&fail)?;

    let matcher = match pattern.strip_prefix(REGEX_MARKER) {
        Some(body) => {
            if body.is_empty() {
                return Err(fail("regex pattern is empty".to_string()));
            }
            // anchored at the start of the name, like a prefix match
            let regex = Regex::new(&format!("^(?:{body})"))
                .map_err(|e| fail(format!("invalid regex pattern: {e}")))?;
            NameMatcher::Regex(regex)
        }
        None => {
            let glob =
                Pattern::new(pattern).map_err(|e| fail(format!("invalid glob pattern: {}", e.msg)))?;
            NameMatcher::Glob(glob)
        }
    };

    Ok(CompiledRule {
        rule: Rule {
            name: name.to_string(),
            pattern: pattern.to_string(),
            destination,
            priority: spec.priority.unwrap_or(index as i64),
        },
        declaration: index,
        matcher,
    })
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, String> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(format!("'{field}' must not be empty")),
        None => Err(format!("missing required field '{field}'")),
    }
}

fn validate_destination(destination: &str) -> Result<PathBuf, String> {
    let path = Path::new(destination);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!(
                    "destination '{destination}' must not leave the target directory"
                ));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("destination '{destination}' must be a relative path"));
            }
        }
    }
    Ok(path.to_path_buf())
}
