use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::cookies::{append_all, clear_session_cookies, parse_cookie, session_cookies};
use crate::auth::{peek_claims, Session, User, EXPIRY_MARGIN_SECS};
use crate::backend::{BackendError, Caller, IdentityProvider};
use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Verified identity for one request. Built once by [`session_middleware`]
/// and read-only afterwards. Either both fields are set or neither is.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub session: Option<Session>,
    pub user: Option<User>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some() && self.user.is_some()
    }

    pub fn caller(&self) -> Option<Caller> {
        match (&self.session, &self.user) {
            (Some(session), Some(user)) => Some(Caller {
                user_id: user.id,
                access_token: session.access_token.clone(),
            }),
            _ => None,
        }
    }
}

/// What the response should do with the session cookies.
#[derive(Debug, Clone, PartialEq)]
pub enum CookieUpdate {
    Keep,
    Store(Session),
    Clear,
}

#[derive(Debug)]
pub struct Verification {
    pub context: RequestContext,
    pub cookies: CookieUpdate,
}

impl Verification {
    fn anonymous(cookies: CookieUpdate) -> Self {
        Self {
            context: RequestContext::anonymous(),
            cookies,
        }
    }
}

/// Derive the session from request cookies and confirm it with the provider.
///
/// Never fails: anything wrong with the session degrades to anonymous.
pub async fn verify(headers: &HeaderMap, identity: &dyn IdentityProvider, config: &SessionConfig) -> Verification {
    let Some(access_token) = parse_cookie(headers, &config.access_cookie) else {
        return Verification::anonymous(CookieUpdate::Keep);
    };
    let refresh_token = parse_cookie(headers, &config.refresh_cookie);

    let claims = match peek_claims(&access_token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Discarding undecodable session cookie: {}", e);
            return Verification::anonymous(CookieUpdate::Clear);
        }
    };

    let mut session = Session {
        access_token,
        refresh_token: refresh_token.clone().unwrap_or_default(),
        expires_at: Some(claims.exp),
    };
    let mut cookies = CookieUpdate::Keep;

    if claims.expires_within(EXPIRY_MARGIN_SECS) {
        let Some(refresh_token) = refresh_token else {
            tracing::debug!("Session expired and no refresh token present");
            return Verification::anonymous(CookieUpdate::Clear);
        };
        match identity.refresh_session(&refresh_token).await {
            Ok(refreshed) => {
                tracing::debug!("Refreshed session for subject {}", claims.sub);
                session = refreshed;
                cookies = CookieUpdate::Store(session.clone());
            }
            // Only a refusal kills the refresh token; an outage leaves it for next time.
            Err(e @ BackendError::Rejected { .. }) => {
                tracing::debug!("Session refresh refused: {}", e);
                return Verification::anonymous(CookieUpdate::Clear);
            }
            Err(e) => {
                tracing::warn!("Session refresh unavailable: {}", e);
                return Verification::anonymous(CookieUpdate::Keep);
            }
        }
    }

    // The cached claim is not trusted; ask the provider who this token belongs to.
    match identity.get_user(&session.access_token).await {
        Ok(user) => Verification {
            context: RequestContext {
                session: Some(session),
                user: Some(user),
            },
            cookies,
        },
        Err(e) => {
            tracing::debug!("Session verification failed: {}", e);
            Verification::anonymous(cookies)
        }
    }
}

/// True when the handler already wrote this cookie itself.
fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    let prefix = format!("{}=", name);
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().map_or(false, |s| s.starts_with(&prefix)))
}

/// Session verifier middleware. Attaches a [`RequestContext`] to every
/// request and writes refreshed or cleared cookies back on the response.
pub async fn session_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let config = &state.config.session;
    let verification = verify(request.headers(), state.identity.as_ref(), config).await;
    request.extensions_mut().insert(verification.context);

    let mut response = next.run(request).await;

    // A handler that set the session itself (login, logout, callback) wins.
    if sets_cookie(response.headers(), &config.access_cookie) {
        return response;
    }
    match verification.cookies {
        CookieUpdate::Keep => {}
        CookieUpdate::Store(session) => append_all(response.headers_mut(), session_cookies(&session, config)),
        CookieUpdate::Clear => append_all(response.headers_mut(), clear_session_cookies(config)),
    }
    response
}

/// Authenticated user context extracted from the verified session.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
}

impl AuthUser {
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.id,
            access_token: self.access_token.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts.extensions.get::<RequestContext>().ok_or_else(ApiError::unauthorized)?;
        match (&context.user, &context.session) {
            (Some(user), Some(session)) => Ok(AuthUser {
                id: user.id,
                email: user.email.clone(),
                access_token: session.access_token.clone(),
            }),
            _ => Err(ApiError::unauthorized()),
        }
    }
}
