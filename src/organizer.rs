//! Destination routing for the organize modes.
//!
//! Every function here is pure: it takes what is already known about a file and
//! returns the directory (relative to the target) it belongs in. The base file
//! name is never changed.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local};

use crate::file_category::FileMapper;
use crate::filesystem::FileTimes;
use crate::rule_engine::{Rule, RuleMatcher};

/// Bucket used when a file has no usable timestamp.
pub const UNKNOWN_DATE_DIR: &str = "Unknown";

/// Directory layout for organize-by-date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateLayout {
    /// `2024/03`
    #[default]
    Nested,
    /// `2024-03`
    Flat,
}

impl fmt::Display for DateLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateLayout::Nested => write!(f, "YYYY/MM"),
            DateLayout::Flat => write!(f, "YYYY-MM"),
        }
    }
}

/// The organize strategy selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizeMode {
    ByType,
    ByDate(DateLayout),
    /// Path of a YAML or JSON rules file.
    ByRules(PathBuf),
}

/// Returns the category directory for `path`, e.g. `Images`.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use dirshift::file_category::FileMapper;
/// use dirshift::organizer::type_bucket;
///
/// let mapper = FileMapper::default();
/// assert_eq!(type_bucket(&mapper, Path::new("photo.JPG")), PathBuf::from("Images"));
/// assert_eq!(type_bucket(&mapper, Path::new("Makefile")), PathBuf::from("Other"));
/// ```
pub fn type_bucket(mapper: &FileMapper, path: &Path) -> PathBuf {
    let extension = path.extension().and_then(|e| e.to_str());
    PathBuf::from(mapper.categorize(extension).dir_name())
}

/// Returns the date directory for a file with the given timestamps.
///
/// Modification time is preferred, creation time is the fallback and
/// [`UNKNOWN_DATE_DIR`] is used when neither is known.
pub fn date_bucket(times: Option<&FileTimes>, layout: DateLayout) -> PathBuf {
    let Some(time) = times.and_then(|t| t.modified.or(t.created)) else {
        return PathBuf::from(UNKNOWN_DATE_DIR);
    };
    date_dir(&time, layout)
}

fn date_dir(time: &DateTime<Local>, layout: DateLayout) -> PathBuf {
    let year = format!("{:04}", time.year());
    let month = format!("{:02}", time.month());
    match layout {
        DateLayout::Nested => PathBuf::from(year).join(month),
        DateLayout::Flat => PathBuf::from(format!("{year}-{month}")),
    }
}

/// Returns the matching rule for `path`, or `None` when no rule applies.
pub fn rule_bucket<'a>(matcher: &'a RuleMatcher, path: &Path) -> Option<&'a Rule> {
    let name = path.file_name()?.to_str()?;
    matcher.resolve(name)
}

/// Joins a bucket onto the target while keeping the file's base name.
pub fn destination_in(target: &Path, bucket: &Path, source: &Path) -> Option<PathBuf> {
    source
        .file_name()
        .map(|name| target.join(bucket).join(name))
}
