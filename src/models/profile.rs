use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile row, keyed 1:1 by the auth user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial profile update; inner `None` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.avatar_url.is_none()
    }

    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(full_name) = &self.full_name {
            profile.full_name = full_name.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            profile.avatar_url = avatar_url.clone();
        }
    }
}
