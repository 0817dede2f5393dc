//! External collaborators: the identity provider and the row-level-security
//! data store. Handlers only ever talk to these traits.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{Session, User};
use crate::models::{NewProject, Profile, ProfileChanges, Project, ProjectChanges, ProjectStatus};

pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;

/// Errors from either backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No row, or a row hidden from the caller by the access policy.
    #[error("Not found")]
    NotFound,

    /// The provider understood the request and refused it.
    #[error("{message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        BackendError::Rejected {
            status,
            code: None,
            message: message.into(),
        }
    }
}

/// Who is calling the store. The access token is what the store's policy
/// evaluates; `user_id` is only used to fill owner columns.
#[derive(Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub access_token: String,
}

impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller").field("user_id", &self.user_id).finish_non_exhaustive()
    }
}

/// Options for listing projects, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<ProjectStatus>,
    pub limit: Option<u32>,
    pub offset: u32,
    /// Ask the store for an exact total count.
    pub count: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPage {
    pub projects: Vec<Project>,
    pub total: Option<u64>,
}

/// Sign-up options forwarded to the provider.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Where the confirmation email should send the user back to.
    pub email_redirect_to: String,
    /// PKCE verifier sent as a `plain` challenge.
    pub code_challenge: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask the provider who owns this access token. This is the authority
    /// check; a locally decoded claim is never trusted on its own.
    async fn get_user(&self, access_token: &str) -> Result<User, BackendError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_up(&self, request: SignUpRequest) -> Result<(), BackendError>;

    async fn exchange_code_for_session(&self, auth_code: &str, code_verifier: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects(&self, caller: &Caller, query: &ListQuery) -> Result<ProjectPage, BackendError>;

    async fn get_project(&self, caller: &Caller, id: Uuid) -> Result<Project, BackendError>;

    async fn insert_project(&self, caller: &Caller, project: &NewProject) -> Result<Project, BackendError>;

    async fn update_project(&self, caller: &Caller, id: Uuid, changes: &ProjectChanges) -> Result<Project, BackendError>;

    async fn delete_project(&self, caller: &Caller, id: Uuid) -> Result<(), BackendError>;

    async fn get_profile(&self, caller: &Caller) -> Result<Profile, BackendError>;

    async fn update_profile(&self, caller: &Caller, changes: &ProfileChanges) -> Result<Profile, BackendError>;
}
