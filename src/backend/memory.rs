use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BackendError, Caller, IdentityProvider, ListQuery, ProjectPage, ProjectStore, SignUpRequest};
use crate::auth::{generate_jwt, verify_jwt, Claims, Session, User};
use crate::models::{NewProject, Profile, ProfileChanges, Project, ProjectChanges};

/// In-process stand-in for the hosted backend, for local development and
/// tests. Access tokens are real HS256 JWTs signed with a per-instance key,
/// and every table read is filtered by the user id inside the token, the way
/// the hosted store's row-level security would.
pub struct MemoryBackend {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_reuse: Duration,
    tables: RwLock<Tables>,
}

/// GoTrue's default refresh token reuse interval.
const REFRESH_REUSE_SECS: i64 = 10;

/// How long an emailed auth code stays redeemable.
const PENDING_CODE_TTL_SECS: i64 = 60 * 60;

struct Account {
    id: Uuid,
    email: String,
    password: String,
}

struct RefreshGrant {
    user_id: Uuid,
    session_id: String,
    /// Replacement token and when it was issued, once this one is used.
    rotated: Option<(String, DateTime<Utc>)>,
}

struct PendingCode {
    user_id: Uuid,
    challenge: String,
    email: String,
    issued_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    refresh_tokens: HashMap<String, RefreshGrant>,
    /// Signed-out session ids, kept until their last access token expires.
    revoked_sessions: HashMap<String, DateTime<Utc>>,
    pending_codes: HashMap<String, PendingCode>,
    projects: Vec<Project>,
    profiles: HashMap<Uuid, Profile>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_access_ttl(Duration::hours(1))
    }

    /// Lifetime of issued access tokens.
    pub fn with_access_ttl(access_ttl: Duration) -> Self {
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()).into_bytes();
        Self {
            secret,
            access_ttl,
            refresh_reuse: Duration::seconds(REFRESH_REUSE_SECS),
            tables: RwLock::new(Tables::default()),
        }
    }

    /// How long a used refresh token still answers with its replacement, so
    /// parallel requests carrying the same cookie all stay signed in.
    pub fn with_refresh_reuse(mut self, interval: Duration) -> Self {
        self.refresh_reuse = interval;
        self
    }

    /// Register a confirmed account and its profile row.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let mut tables = self.tables.write().await;
        Self::insert_account(&mut tables, email, password)
    }

    /// The auth code a confirmation email would have carried for `email`.
    pub async fn pending_code(&self, email: &str) -> Option<String> {
        let tables = self.tables.read().await;
        tables
            .pending_codes
            .iter()
            .find(|(_, pending)| pending.email == email)
            .map(|(code, _)| code.clone())
    }

    fn insert_account(tables: &mut Tables, email: &str, password: &str) -> Result<User, BackendError> {
        if tables.accounts.iter().any(|a| a.email == email) {
            return Err(BackendError::Rejected {
                status: 422,
                code: Some("user_already_exists".to_string()),
                message: "User already registered".to_string(),
            });
        }

        let id = Uuid::new_v4();
        tables.accounts.push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });
        tables.profiles.insert(
            id,
            Profile {
                id,
                full_name: None,
                avatar_url: None,
                created_at: Utc::now(),
                updated_at: None,
            },
        );

        Ok(User {
            id,
            email: Some(email.to_string()),
        })
    }

    fn sign_access(&self, tables: &Tables, user_id: Uuid, session_id: &str) -> Result<(String, i64), BackendError> {
        let email = tables.accounts.iter().find(|a| a.id == user_id).map(|a| a.email.clone());
        let claims = Claims::new(user_id, email, session_id.to_string(), self.access_ttl);
        let access_token = generate_jwt(&claims, &self.secret).map_err(|e| BackendError::rejected(500, e.to_string()))?;
        Ok((access_token, claims.exp))
    }

    fn issue_session(&self, tables: &mut Tables, user_id: Uuid, session_id: String) -> Result<Session, BackendError> {
        let (access_token, expires_at) = self.sign_access(tables, user_id, &session_id)?;

        let refresh_token = Uuid::new_v4().simple().to_string();
        tables.refresh_tokens.insert(
            refresh_token.clone(),
            RefreshGrant {
                user_id,
                session_id,
                rotated: None,
            },
        );

        Ok(Session {
            access_token,
            refresh_token,
            expires_at: Some(expires_at),
        })
    }

    /// Drop used refresh tokens past their reuse window, revocations whose
    /// tokens have all expired, and stale auth codes.
    fn prune(&self, tables: &mut Tables, now: DateTime<Utc>) {
        let reuse = self.refresh_reuse;
        tables
            .refresh_tokens
            .retain(|_, grant| grant.rotated.as_ref().map_or(true, |(_, at)| now < *at + reuse));
        tables.revoked_sessions.retain(|_, until| now < *until);
        tables
            .pending_codes
            .retain(|_, pending| now < pending.issued_at + Duration::seconds(PENDING_CODE_TTL_SECS));
    }

    /// Resolve the token to a live user id, as the store's policy would.
    fn authorize(&self, tables: &Tables, access_token: &str) -> Result<Uuid, BackendError> {
        let claims = verify_jwt(access_token, &self.secret).map_err(|e| BackendError::Rejected {
            status: 401,
            code: Some("bad_jwt".to_string()),
            message: e.to_string(),
        })?;

        if let Some(session_id) = &claims.session_id {
            if tables.revoked_sessions.contains_key(session_id) {
                return Err(BackendError::Rejected {
                    status: 403,
                    code: Some("session_not_found".to_string()),
                    message: "Session from session_id claim in JWT does not exist".to_string(),
                });
            }
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| BackendError::rejected(401, "invalid sub claim"))?;
        if !tables.accounts.iter().any(|a| a.id == user_id) {
            return Err(BackendError::rejected(403, "User from sub claim in JWT does not exist"));
        }
        Ok(user_id)
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn get_user(&self, access_token: &str) -> Result<User, BackendError> {
        let tables = self.tables.read().await;
        let user_id = self.authorize(&tables, access_token)?;
        let email = tables.accounts.iter().find(|a| a.id == user_id).map(|a| a.email.clone());
        Ok(User { id: user_id, email })
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        self.prune(&mut tables, now);

        let grant = tables.refresh_tokens.get(refresh_token).ok_or_else(|| BackendError::Rejected {
            status: 400,
            code: Some("refresh_token_not_found".to_string()),
            message: "Invalid Refresh Token: Refresh Token Not Found".to_string(),
        })?;
        let user_id = grant.user_id;
        let session_id = grant.session_id.clone();
        let rotated = grant.rotated.clone();

        if tables.revoked_sessions.contains_key(&session_id) {
            return Err(BackendError::rejected(400, "Invalid Refresh Token: Session Expired"));
        }

        // Inside the reuse window: same replacement token, fresh access token.
        if let Some((successor, _)) = rotated {
            let (access_token, expires_at) = self.sign_access(&tables, user_id, &session_id)?;
            return Ok(Session {
                access_token,
                refresh_token: successor,
                expires_at: Some(expires_at),
            });
        }

        let session = self.issue_session(&mut tables, user_id, session_id)?;
        if let Some(grant) = tables.refresh_tokens.get_mut(refresh_token) {
            grant.rotated = Some((session.refresh_token.clone(), now));
        }
        Ok(session)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let mut tables = self.tables.write().await;
        let user_id = tables
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .map(|a| a.id)
            .ok_or_else(|| BackendError::Rejected {
                status: 400,
                code: Some("invalid_credentials".to_string()),
                message: "Invalid login credentials".to_string(),
            })?;

        self.issue_session(&mut tables, user_id, Uuid::new_v4().to_string())
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<(), BackendError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        self.prune(&mut tables, now);
        let user = Self::insert_account(&mut tables, &request.email, &request.password)?;

        let code = Uuid::new_v4().to_string();
        // stands in for the confirmation email
        tracing::info!(
            "Confirmation link for {}: {}?code={}",
            request.email,
            request.email_redirect_to,
            code
        );
        tables.pending_codes.insert(
            code,
            PendingCode {
                user_id: user.id,
                challenge: request.code_challenge,
                email: request.email,
                issued_at: now,
            },
        );
        Ok(())
    }

    async fn exchange_code_for_session(&self, auth_code: &str, code_verifier: &str) -> Result<Session, BackendError> {
        let mut tables = self.tables.write().await;
        self.prune(&mut tables, Utc::now());
        let pending = tables.pending_codes.remove(auth_code).ok_or_else(|| BackendError::Rejected {
            status: 404,
            code: Some("flow_state_not_found".to_string()),
            message: "invalid flow state, no valid flow state found".to_string(),
        })?;

        if pending.challenge != code_verifier {
            return Err(BackendError::Rejected {
                status: 403,
                code: Some("bad_code_verifier".to_string()),
                message: "code challenge does not match previously saved code verifier".to_string(),
            });
        }

        self.issue_session(&mut tables, pending.user_id, Uuid::new_v4().to_string())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        self.prune(&mut tables, now);
        self.authorize(&tables, access_token)?;

        let claims = verify_jwt(access_token, &self.secret).map_err(|e| BackendError::rejected(401, e.to_string()))?;
        if let Some(session_id) = claims.session_id {
            tables.refresh_tokens.retain(|_, grant| grant.session_id != session_id);
            // no token from this session outlives its access TTL
            tables.revoked_sessions.insert(session_id, now + self.access_ttl);
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryBackend {
    async fn list_projects(&self, caller: &Caller, query: &ListQuery) -> Result<ProjectPage, BackendError> {
        let tables = self.tables.read().await;
        let user_id = self.authorize(&tables, &caller.access_token)?;

        let mut visible: Vec<&Project> = tables
            .projects
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter(|p| query.status.map_or(true, |s| p.status == s))
            .collect();
        // newest first; insertion order breaks ties
        visible.reverse();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = query.count.then_some(visible.len() as u64);
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let projects = visible
            .into_iter()
            .skip(query.offset as usize)
            .take(limit)
            .cloned()
            .collect();

        Ok(ProjectPage { projects, total })
    }

    async fn get_project(&self, caller: &Caller, id: Uuid) -> Result<Project, BackendError> {
        let tables = self.tables.read().await;
        let user_id = self.authorize(&tables, &caller.access_token)?;
        tables
            .projects
            .iter()
            .find(|p| p.id == id && p.user_id == user_id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn insert_project(&self, caller: &Caller, project: &NewProject) -> Result<Project, BackendError> {
        let mut tables = self.tables.write().await;
        let user_id = self.authorize(&tables, &caller.access_token)?;

        if project.user_id != user_id {
            return Err(BackendError::Rejected {
                status: 403,
                code: Some("42501".to_string()),
                message: "new row violates row-level security policy for table \"projects\"".to_string(),
            });
        }

        let row = Project {
            id: Uuid::new_v4(),
            user_id,
            name: project.name.clone(),
            description: project.description.clone(),
            status: project.status,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.projects.push(row.clone());
        Ok(row)
    }

    async fn update_project(&self, caller: &Caller, id: Uuid, changes: &ProjectChanges) -> Result<Project, BackendError> {
        let mut tables = self.tables.write().await;
        let user_id = self.authorize(&tables, &caller.access_token)?;

        let project = tables
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
            .ok_or(BackendError::NotFound)?;
        changes.apply_to(project);
        project.updated_at = Some(Utc::now());
        Ok(project.clone())
    }

    async fn delete_project(&self, caller: &Caller, id: Uuid) -> Result<(), BackendError> {
        let mut tables = self.tables.write().await;
        let user_id = self.authorize(&tables, &caller.access_token)?;
        // Rows hidden by policy are silently untouched, as with PostgREST.
        tables.projects.retain(|p| !(p.id == id && p.user_id == user_id));
        Ok(())
    }

    async fn get_profile(&self, caller: &Caller) -> Result<Profile, BackendError> {
        let tables = self.tables.read().await;
        let user_id = self.authorize(&tables, &caller.access_token)?;
        tables.profiles.get(&user_id).cloned().ok_or(BackendError::NotFound)
    }

    async fn update_profile(&self, caller: &Caller, changes: &ProfileChanges) -> Result<Profile, BackendError> {
        let mut tables = self.tables.write().await;
        let user_id = self.authorize(&tables, &caller.access_token)?;

        let profile = tables.profiles.get_mut(&user_id).ok_or(BackendError::NotFound)?;
        changes.apply_to(profile);
        profile.updated_at = Some(Utc::now());
        Ok(profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectStatus;

    async fn signed_in(backend: &MemoryBackend, email: &str) -> Caller {
        let user = backend.create_user(email, "secret123").await.unwrap();
        let session = backend.sign_in_with_password(email, "secret123").await.unwrap();
        Caller {
            user_id: user.id,
            access_token: session.access_token,
        }
    }

    fn new_project(caller: &Caller, name: &str, status: ProjectStatus) -> NewProject {
        NewProject {
            user_id: caller.user_id,
            name: name.to_string(),
            description: None,
            status,
        }
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let backend = MemoryBackend::new();
        backend.create_user("a@example.com", "secret123").await.unwrap();
        let err = backend.sign_in_with_password("a@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let backend = MemoryBackend::new();
        backend.create_user("a@example.com", "secret123").await.unwrap();
        assert!(backend.create_user("a@example.com", "other123").await.is_err());
    }

    #[tokio::test]
    async fn rows_are_scoped_to_the_token_owner() {
        let backend = MemoryBackend::new();
        let alice = signed_in(&backend, "alice@example.com").await;
        let bob = signed_in(&backend, "bob@example.com").await;

        let project = backend
            .insert_project(&alice, &new_project(&alice, "Alpha", ProjectStatus::Draft))
            .await
            .unwrap();

        assert!(matches!(backend.get_project(&bob, project.id).await, Err(BackendError::NotFound)));
        let page = backend.list_projects(&bob, &ListQuery { count: true, ..Default::default() }).await.unwrap();
        assert_eq!(page.total, Some(0));

        // bob's delete is a no-op, alice still sees the row
        backend.delete_project(&bob, project.id).await.unwrap();
        assert!(backend.get_project(&alice, project.id).await.is_ok());
    }

    #[tokio::test]
    async fn insert_for_someone_else_violates_policy() {
        let backend = MemoryBackend::new();
        let alice = signed_in(&backend, "alice@example.com").await;
        let bob = signed_in(&backend, "bob@example.com").await;

        let err = backend
            .insert_project(&alice, &new_project(&bob, "Sneaky", ProjectStatus::Draft))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn list_filters_orders_and_pages() {
        let backend = MemoryBackend::new();
        let alice = signed_in(&backend, "alice@example.com").await;
        for (name, status) in [("one", ProjectStatus::Draft), ("two", ProjectStatus::Active), ("three", ProjectStatus::Active)] {
            backend.insert_project(&alice, &new_project(&alice, name, status)).await.unwrap();
        }

        let page = backend
            .list_projects(&alice, &ListQuery { count: true, ..Default::default() })
            .await
            .unwrap();
        let names: Vec<_> = page.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["three", "two", "one"]);

        let active = backend
            .list_projects(
                &alice,
                &ListQuery {
                    status: Some(ProjectStatus::Active),
                    limit: Some(1),
                    offset: 1,
                    count: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(active.total, Some(2));
        assert_eq!(active.projects.len(), 1);
        assert_eq!(active.projects[0].name, "two");
    }

    #[tokio::test]
    async fn refresh_rotates_and_sign_out_revokes() {
        let backend = MemoryBackend::new().with_refresh_reuse(Duration::zero());
        backend.create_user("a@example.com", "secret123").await.unwrap();
        let session = backend.sign_in_with_password("a@example.com", "secret123").await.unwrap();

        let refreshed = backend.refresh_session(&session.refresh_token).await.unwrap();
        assert!(backend.refresh_session(&session.refresh_token).await.is_err());
        assert!(backend.get_user(&refreshed.access_token).await.is_ok());

        backend.sign_out(&refreshed.access_token).await.unwrap();
        assert!(backend.get_user(&refreshed.access_token).await.is_err());
        assert!(backend.refresh_session(&refreshed.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn used_refresh_token_answers_within_reuse_window() {
        let backend = MemoryBackend::new();
        backend.create_user("a@example.com", "secret123").await.unwrap();
        let session = backend.sign_in_with_password("a@example.com", "secret123").await.unwrap();

        let first = backend.refresh_session(&session.refresh_token).await.unwrap();
        let second = backend.refresh_session(&session.refresh_token).await.unwrap();
        assert_eq!(second.refresh_token, first.refresh_token);
        assert!(backend.get_user(&second.access_token).await.is_ok());

        // the replacement still rotates normally
        let third = backend.refresh_session(&first.refresh_token).await.unwrap();
        assert_ne!(third.refresh_token, first.refresh_token);
    }

    #[tokio::test]
    async fn stale_state_is_pruned() {
        let backend = MemoryBackend::new();
        backend.create_user("a@example.com", "secret123").await.unwrap();
        {
            let mut tables = backend.tables.write().await;
            let past = Utc::now() - Duration::seconds(1);
            tables.revoked_sessions.insert("long-gone".to_string(), past);
            tables.pending_codes.insert(
                "old-code".to_string(),
                PendingCode {
                    user_id: Uuid::new_v4(),
                    challenge: "c".to_string(),
                    email: "old@example.com".to_string(),
                    issued_at: Utc::now() - Duration::seconds(PENDING_CODE_TTL_SECS + 1),
                },
            );
        }

        let session = backend.sign_in_with_password("a@example.com", "secret123").await.unwrap();
        backend.sign_out(&session.access_token).await.unwrap();

        let tables = backend.tables.read().await;
        assert!(!tables.revoked_sessions.contains_key("long-gone"));
        assert_eq!(tables.revoked_sessions.len(), 1);
        assert!(tables.pending_codes.is_empty());
        assert!(tables.refresh_tokens.is_empty());
    }

    #[tokio::test]
    async fn expired_auth_code_is_refused() {
        let backend = MemoryBackend::new();
        backend
            .sign_up(SignUpRequest {
                email: "late@example.com".to_string(),
                password: "secret123".to_string(),
                email_redirect_to: "http://localhost/auth/callback".to_string(),
                code_challenge: "verifier-1".to_string(),
            })
            .await
            .unwrap();
        let code = backend.pending_code("late@example.com").await.unwrap();
        {
            let mut tables = backend.tables.write().await;
            if let Some(pending) = tables.pending_codes.get_mut(&code) {
                pending.issued_at = Utc::now() - Duration::seconds(PENDING_CODE_TTL_SECS + 1);
            }
        }

        assert!(backend.exchange_code_for_session(&code, "verifier-1").await.is_err());
    }

    #[tokio::test]
    async fn pkce_code_requires_matching_verifier() {
        let backend = MemoryBackend::new();
        backend
            .sign_up(SignUpRequest {
                email: "new@example.com".to_string(),
                password: "secret123".to_string(),
                email_redirect_to: "http://localhost/auth/callback".to_string(),
                code_challenge: "verifier-1".to_string(),
            })
            .await
            .unwrap();

        let code = backend.pending_code("new@example.com").await.unwrap();
        assert!(backend.exchange_code_for_session(&code, "wrong").await.is_err());

        // a failed exchange consumes the code
        assert!(backend.pending_code("new@example.com").await.is_none());
    }
}
