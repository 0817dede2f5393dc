use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a project row. Serialized lowercase, matching the
/// `project_status` enum in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Draft,
        ProjectStatus::Active,
        ProjectStatus::Completed,
        ProjectStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    /// "draft, active, completed, archived"
    pub fn listing() -> String {
        Self::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid status. Must be one of: {}", Self::listing()))
    }
}

/// A project row as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload. `user_id` is the acting user; the store's access policy
/// rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProject {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
}

/// Partial update. Outer `None` means "leave unchanged"; for `description`
/// the inner `None` writes null.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }

    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(status) = self.status {
            project.status = status;
        }
    }
}
