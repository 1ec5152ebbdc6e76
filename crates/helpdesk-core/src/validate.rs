//! Field validation for user-supplied ticket and comment text.

use crate::error::{HelpdeskError, Result};
use crate::model::Priority;
use serde::{Deserialize, Serialize};

pub const MAX_TOPIC_CHARS: usize = 18;
pub const MAX_DESCRIPTION_CHARS: usize = 255;
pub const MAX_REASON_CHARS: usize = 255;
pub const MAX_COMMENT_CHARS: usize = 8_192;

/// Length limits applied to free-text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_topic_max")]
    pub topic_max_chars: usize,
    #[serde(default = "default_description_max")]
    pub description_max_chars: usize,
    #[serde(default = "default_reason_max")]
    pub reason_max_chars: usize,
    #[serde(default = "default_comment_max")]
    pub comment_max_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            topic_max_chars: MAX_TOPIC_CHARS,
            description_max_chars: MAX_DESCRIPTION_CHARS,
            reason_max_chars: MAX_REASON_CHARS,
            comment_max_chars: MAX_COMMENT_CHARS,
        }
    }
}

const fn default_topic_max() -> usize {
    MAX_TOPIC_CHARS
}

const fn default_description_max() -> usize {
    MAX_DESCRIPTION_CHARS
}

const fn default_reason_max() -> usize {
    MAX_REASON_CHARS
}

const fn default_comment_max() -> usize {
    MAX_COMMENT_CHARS
}

/// Trim `value` and check it is non-empty, within `max` characters and free
/// of control characters (newline and tab only when `multiline`).
fn bounded_text(field: &'static str, value: &str, max: usize, multiline: bool) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HelpdeskError::validation(field, "must not be empty"));
    }
    let count = trimmed.chars().count();
    if count > max {
        return Err(HelpdeskError::validation(
            field,
            format!("must be <= {max} characters (got {count})"),
        ));
    }
    let bad_control = trimmed
        .chars()
        .any(|ch| ch.is_control() && !(multiline && (ch == '\n' || ch == '\t')));
    if bad_control {
        return Err(HelpdeskError::validation(
            field,
            "must not contain control characters",
        ));
    }
    Ok(trimmed.to_string())
}

impl Limits {
    /// # Errors
    ///
    /// Returns `Validation` when the topic is blank, too long or multi-line.
    pub fn topic(&self, value: &str) -> Result<String> {
        bounded_text("topic", value, self.topic_max_chars, false)
    }

    /// # Errors
    ///
    /// Returns `Validation` when the description is blank or too long.
    pub fn description(&self, value: &str) -> Result<String> {
        bounded_text("description", value, self.description_max_chars, true)
    }

    /// # Errors
    ///
    /// Returns `Validation` when the decline reason is blank or too long.
    pub fn decline_reason(&self, value: &str) -> Result<String> {
        bounded_text("decline_reason", value, self.reason_max_chars, true)
    }

    /// # Errors
    ///
    /// Returns `Validation` when the comment text is blank or too long.
    pub fn comment_text(&self, value: &str) -> Result<String> {
        bounded_text("text", value, self.comment_max_chars, true)
    }
}

/// # Errors
///
/// Returns `Validation` when `value` is not one of low, medium or high.
pub fn priority(value: &str) -> Result<Priority> {
    value
        .parse()
        .map_err(|_| HelpdeskError::validation("priority", format!("unknown priority '{value}'")))
}
