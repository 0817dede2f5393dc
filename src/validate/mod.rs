//! Input validation and normalization. Everything here is pure: no I/O, and
//! expected failures come back as a [`Rejection`] rather than a panic or an
//! HTTP error.

pub mod credentials;
pub mod profile;
pub mod project;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use credentials::{Credentials, LoginForm, SignupForm};
pub use profile::ProfileInput;
pub use project::{ProjectForm, ProjectInput};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_FULL_NAME_CHARS: usize = 100;
pub const MAX_AVATAR_URL_CHARS: usize = 500;
pub const MIN_PASSWORD_CHARS: usize = 6;

pub const NO_VALID_FIELDS: &str = "No valid fields to update";

/// Why input was refused, plus whatever the caller should get back to
/// re-display the form.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub message: String,
    pub values: Option<Value>,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            values: None,
        }
    }

    pub fn with_values(mut self, values: Value) -> Self {
        self.values = Some(values);
        self
    }
}

/// Keeps an explicit JSON `null` as `Some(Value::Null)` so that "absent" and
/// "set to null" stay distinguishable. Pair with `#[serde(default)]`.
pub(crate) fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Lengths are measured in characters on the raw input, before trimming.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Trim; empty becomes `None`.
pub(crate) fn normalize_optional(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_blank_to_none() {
        assert_eq!(normalize_optional("   "), None);
        assert_eq!(normalize_optional(""), None);
        assert_eq!(normalize_optional("  hi "), Some("hi".to_string()));
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(char_len("héllo"), 5);
        assert_eq!(char_len(&"é".repeat(100)), 100);
    }
}
