//! Pure file-name transforms.
//!
//! Every transform works on the stem and leaves the extension (the text from
//! the last `.` onward, unless that dot starts the name) byte-identical.

use std::fmt;

use crate::error::RenameError;

/// Placeholders replaced by the sequence number in a sequential template.
const SEQUENCE_PLACEHOLDERS: [&str; 2] = ["{n}", "{}"];

/// Case transformation applied to the stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseStyle {
    Lower,
    Upper,
    /// First letter of every word upper-cased, the rest lower-cased.
    Title,
}

impl fmt::Display for CaseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStyle::Lower => write!(f, "lowercase"),
            CaseStyle::Upper => write!(f, "uppercase"),
            CaseStyle::Title => write!(f, "title"),
        }
    }
}

/// The rename transform selected for a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameMode {
    /// Literal substring substitution in the stem.
    FindReplace { find: String, replace: String },
    /// Template with a `{n}` (or `{}`) placeholder numbered from 1.
    Sequential { template: String },
    Case(CaseStyle),
    /// Prefix before the stem, suffix before the extension.
    Affix { prefix: String, suffix: String },
}

impl RenameMode {
    /// Checks options that can never produce a sensible rename.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            RenameMode::FindReplace { find, .. } if find.is_empty() => {
                Err("the text to find must not be empty".to_string())
            }
            RenameMode::Sequential { template } if template.is_empty() => {
                Err("the sequential template must not be empty".to_string())
            }
            RenameMode::Sequential { template }
                if !SEQUENCE_PLACEHOLDERS.iter().any(|p| template.contains(p)) =>
            {
                Err(format!(
                    "the sequential template '{template}' needs a {{n}} or {{}} placeholder"
                ))
            }
            RenameMode::Affix { prefix, suffix } if prefix.is_empty() && suffix.is_empty() => {
                Err("a prefix or a suffix is required".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Computes the new name for `name`.
    ///
    /// `sequence` is the file's 1-based position in the stable input order and
    /// is only used by [`RenameMode::Sequential`].
    pub fn apply(&self, name: &str, sequence: usize) -> Result<String, RenameError> {
        let (stem, extension) = split_name(name);
        let new_stem = match self {
            RenameMode::FindReplace { find, replace } => stem.replace(find.as_str(), replace),
            RenameMode::Sequential { template } => {
                let number = sequence.to_string();
                SEQUENCE_PLACEHOLDERS
                    .iter()
                    .fold(template.clone(), |acc, placeholder| {
                        acc.replace(placeholder, &number)
                    })
            }
            RenameMode::Case(style) => change_case(stem, *style),
            RenameMode::Affix { prefix, suffix } => format!("{prefix}{stem}{suffix}"),
        };

        if new_stem.is_empty() {
            return Err(RenameError::EmptyName {
                original: name.to_string(),
            });
        }
        let proposed = format!("{new_stem}{extension}");
        if proposed.contains('/') || proposed.contains(std::path::MAIN_SEPARATOR) {
            return Err(RenameError::PathSeparator {
                original: name.to_string(),
                proposed,
            });
        }
        Ok(proposed)
    }
}

/// Splits a file name into stem and extension (extension keeps its dot).
///
/// ```
/// use dirshift::renamer::split_name;
///
/// assert_eq!(split_name("report.final.pdf"), ("report.final", ".pdf"));
/// assert_eq!(split_name("README"), ("README", ""));
/// assert_eq!(split_name(".bashrc"), (".bashrc", ""));
/// ```
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn change_case(stem: &str, style: CaseStyle) -> String {
    match style {
        CaseStyle::Lower => stem.to_lowercase(),
        CaseStyle::Upper => stem.to_uppercase(),
        CaseStyle::Title => {
            let mut out = String::with_capacity(stem.len());
            let mut in_word = false;
            for c in stem.chars() {
                if c.is_alphabetic() {
                    if in_word {
                        out.extend(c.to_lowercase());
                    } else {
                        out.extend(c.to_uppercase());
                    }
                    in_word = true;
                } else {
                    out.push(c);
                    in_word = false;
                }
            }
            out
        }
    }
}
