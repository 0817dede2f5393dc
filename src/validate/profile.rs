use serde::Deserialize;
use serde_json::Value;

use super::{char_len, normalize_optional, present, Rejection, MAX_AVATAR_URL_CHARS, MAX_FULL_NAME_CHARS, NO_VALID_FIELDS};
use crate::models::ProfileChanges;

/// JSON body for `PATCH /api/user`.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileInput {
    #[serde(default, rename = "fullName", deserialize_with = "present")]
    pub full_name: Option<Value>,
    #[serde(default, rename = "avatarUrl", deserialize_with = "present")]
    pub avatar_url: Option<Value>,
}

impl ProfileInput {
    pub fn from_json(body: Value) -> Self {
        match body {
            Value::Object(_) => serde_json::from_value(body).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

fn optional_text(value: &Value, max: usize, too_long: &str, not_text: &str) -> Result<Option<String>, Rejection> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if char_len(s) > max => Err(Rejection::new(too_long)),
        Value::String(s) => Ok(normalize_optional(s)),
        _ => Err(Rejection::new(not_text)),
    }
}

pub fn validate_update(input: &ProfileInput) -> Result<ProfileChanges, Rejection> {
    let mut changes = ProfileChanges::default();

    if let Some(value) = &input.full_name {
        changes.full_name = Some(optional_text(
            value,
            MAX_FULL_NAME_CHARS,
            "Full name must be less than 100 characters",
            "Full name must be a string",
        )?);
    }

    if let Some(value) = &input.avatar_url {
        changes.avatar_url = Some(optional_text(
            value,
            MAX_AVATAR_URL_CHARS,
            "Avatar URL is too long",
            "Avatar URL must be a string",
        )?);
    }

    if changes.is_empty() {
        return Err(Rejection::new(NO_VALID_FIELDS));
    }
    Ok(changes)
}
