use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{char_len, normalize_optional, present, Rejection, MAX_DESCRIPTION_CHARS, MAX_NAME_CHARS, NO_VALID_FIELDS};
use crate::models::{NewProject, ProjectChanges, ProjectStatus};

const NAME_REQUIRED: &str = "Project name is required";
const NAME_EMPTY: &str = "Project name cannot be empty";
const NAME_TOO_LONG: &str = "Project name must be less than 100 characters";
const DESCRIPTION_TOO_LONG: &str = "Description must be less than 500 characters";
const DESCRIPTION_NOT_TEXT: &str = "Description must be a string";

/// JSON body for `POST /api/projects` and `PATCH /api/projects/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectInput {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Value>,
}

impl ProjectInput {
    /// Anything that is not a JSON object carries no recognized fields.
    pub fn from_json(body: Value) -> Self {
        match body {
            Value::Object(_) => serde_json::from_value(body).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

/// Urlencoded body of the server-rendered new/edit project forms.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProjectForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ProjectForm {
    /// Submitted values, for re-displaying the form.
    pub fn values(&self) -> Value {
        json!({
            "name": self.name.clone().unwrap_or_default(),
            "description": self.description.clone().unwrap_or_default(),
            "status": self.status.clone().unwrap_or_default(),
        })
    }
}

fn status_rejection() -> Rejection {
    Rejection::new(format!("Invalid status. Must be one of: {}", ProjectStatus::listing()))
}

fn check_name_length(name: &str) -> Result<(), Rejection> {
    if char_len(name) > MAX_NAME_CHARS {
        return Err(Rejection::new(NAME_TOO_LONG));
    }
    Ok(())
}

/// `None` for null; trimmed text otherwise, empty normalized to `None`.
fn description_value(value: &Value) -> Result<Option<String>, Rejection> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => description_text(s),
        _ => Err(Rejection::new(DESCRIPTION_NOT_TEXT)),
    }
}

fn description_text(s: &str) -> Result<Option<String>, Rejection> {
    if char_len(s) > MAX_DESCRIPTION_CHARS {
        return Err(Rejection::new(DESCRIPTION_TOO_LONG));
    }
    Ok(normalize_optional(s))
}

/// Validate a create request. Missing, null or empty status defaults to draft.
pub fn validate_create(input: &ProjectInput, owner: Uuid) -> Result<NewProject, Rejection> {
    let name = match &input.name {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => return Err(Rejection::new(NAME_REQUIRED)),
    };
    check_name_length(name)?;

    let description = match &input.description {
        Some(value) => description_value(value)?,
        None => None,
    };

    let status = match &input.status {
        None | Some(Value::Null) => ProjectStatus::Draft,
        Some(Value::String(s)) if s.is_empty() => ProjectStatus::Draft,
        Some(Value::String(s)) => s.parse().map_err(|_| status_rejection())?,
        Some(_) => return Err(status_rejection()),
    };

    Ok(NewProject {
        user_id: owner,
        name: name.trim().to_string(),
        description,
        status,
    })
}

/// Validate a partial update. Every present field (explicit null included)
/// is checked; an update that names no recognized field is refused.
pub fn validate_update(input: &ProjectInput) -> Result<ProjectChanges, Rejection> {
    let mut changes = ProjectChanges::default();

    if let Some(value) = &input.name {
        let name = match value {
            Value::String(s) if !s.trim().is_empty() => s,
            _ => return Err(Rejection::new(NAME_EMPTY)),
        };
        check_name_length(name)?;
        changes.name = Some(name.trim().to_string());
    }

    if let Some(value) = &input.description {
        changes.description = Some(description_value(value)?);
    }

    if let Some(value) = &input.status {
        let status = value
            .as_str()
            .and_then(|s| s.parse::<ProjectStatus>().ok())
            .ok_or_else(status_rejection)?;
        changes.status = Some(status);
    }

    if changes.is_empty() {
        return Err(Rejection::new(NO_VALID_FIELDS));
    }
    Ok(changes)
}

fn form_name(form: &ProjectForm) -> Result<String, Rejection> {
    let name = form.name.as_deref().unwrap_or_default();
    if name.trim().is_empty() {
        return Err(Rejection::new(NAME_REQUIRED));
    }
    check_name_length(name)?;
    Ok(name.trim().to_string())
}

fn form_status(form: &ProjectForm) -> Result<Option<ProjectStatus>, Rejection> {
    match form.status.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| status_rejection()),
    }
}

fn create_form_fields(form: &ProjectForm, owner: Uuid) -> Result<NewProject, Rejection> {
    let name = form_name(form)?;
    let description = description_text(form.description.as_deref().unwrap_or_default())?;
    let status = form_status(form)?.unwrap_or_default();
    Ok(NewProject {
        user_id: owner,
        name,
        description,
        status,
    })
}

fn update_form_fields(form: &ProjectForm) -> Result<ProjectChanges, Rejection> {
    let name = form_name(form)?;
    let description = description_text(form.description.as_deref().unwrap_or_default())?;
    let status = form_status(form)?;
    Ok(ProjectChanges {
        name: Some(name),
        description: Some(description),
        status,
    })
}

/// Validate the new-project form. Rejections echo the submitted values.
pub fn validate_create_form(form: &ProjectForm, owner: Uuid) -> Result<NewProject, Rejection> {
    create_form_fields(form, owner).map_err(|r| r.with_values(form.values()))
}

/// Validate the edit-project form. Name and description are always written;
/// a blank status leaves the stored one alone.
pub fn validate_update_form(form: &ProjectForm) -> Result<ProjectChanges, Rejection> {
    update_form_fields(form).map_err(|r| r.with_values(form.values()))
}
