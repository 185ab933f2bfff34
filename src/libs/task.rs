//! Task model and name validation.

use crate::libs::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TASK_NAME_MIN_CHARS: usize = 3;
pub const TASK_NAME_MAX_CHARS: usize = 100;

const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub is_complete: bool,
    pub category_id: Option<i64>,
    /// Name of the referenced category, joined on read.
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Complete,
    Incomplete,
}

impl TaskFilter {
    pub(crate) fn completion(self) -> Option<bool> {
        match self {
            TaskFilter::All => None,
            TaskFilter::Complete => Some(true),
            TaskFilter::Incomplete => Some(false),
        }
    }
}

/// Trims `name` and checks it is 3–100 characters without path separators.
pub fn validate_task_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let invalid = |reason| Error::InvalidName {
        name: name.to_string(),
        reason,
    };

    let chars = trimmed.chars().count();
    if chars < TASK_NAME_MIN_CHARS {
        return Err(invalid("must be at least 3 characters"));
    }
    if chars > TASK_NAME_MAX_CHARS {
        return Err(invalid("must be at most 100 characters"));
    }
    if trimmed.contains(FORBIDDEN_NAME_CHARS) {
        return Err(invalid("must not contain path separators"));
    }

    Ok(trimmed.to_string())
}

/// Normalizes user-entered tags: trims, drops empties and duplicates.
/// Tags holding control characters are dropped as well, since stored tag
/// lists are joined on the unit separator.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_string())
        .filter(|tag| !tag.is_empty() && !tag.chars().any(char::is_control))
        .collect()
}

/// Splits a comma-separated tag list as typed into a text field.
pub fn parse_tag_list(input: &str) -> BTreeSet<String> {
    normalize_tags(input.split(','))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_names_within_bounds() {
        assert_eq!(validate_task_name("  Write report ").unwrap(), "Write report");
        assert!(validate_task_name("abc").is_ok());
        assert!(validate_task_name(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn rejects_short_long_and_path_like_names() {
        assert!(validate_task_name("ab").is_err());
        assert!(validate_task_name("   ").is_err());
        assert!(validate_task_name(&"x".repeat(101)).is_err());
        assert!(validate_task_name("reports/2024").is_err());
        assert!(validate_task_name("C:\\temp").is_err());
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert!(validate_task_name("日本語").is_ok());
        assert!(validate_task_name(&"é".repeat(100)).is_ok());
    }

    #[test]
    fn tag_list_is_trimmed_and_deduplicated() {
        let tags = parse_tag_list(" backend, ui ,, backend ");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["backend", "ui"]);
    }

    #[test]
    fn tags_with_control_characters_are_dropped() {
        let tags = normalize_tags(["api\u{1f}db", "line\nbreak", "tab\there", " ok "]);
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["ok"]);
    }
}
