//! Extractors resolving who is calling

use crate::auth::groups::GroupPolicy;
use crate::auth::session::SessionError;
use crate::auth::token::Claims;
use crate::errors::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum_extra::extract::cookie::CookieJar;
use http::header::AUTHORIZATION;
use http::request::Parts;
use log::{debug, warn};

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "session_id";

/// Subject of the synthetic identity used in development deployments
pub const DEVELOPMENT_SUBJECT: &str = "development";

/// A caller holding a browser session
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub groups: Vec<i32>,
    /// Absent for the development identity
    pub session_id: Option<String>,
}

impl SessionUser {
    fn development(state: &AppState) -> Self {
        Self {
            sub: DEVELOPMENT_SUBJECT.to_string(),
            name: Some("Development user".to_string()),
            email: None,
            groups: vec![state.groups.admin_group_id()],
            session_id: None,
        }
    }

    async fn from_cookie(parts: &Parts, state: &AppState) -> Result<Option<Self>, ApiError> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(None);
        };

        match state.sessions.get_session(&session_id).await {
            Ok(session) => Ok(Some(Self {
                sub: session.sub,
                name: session.name,
                email: session.email,
                groups: session.groups,
                session_id: Some(session_id),
            })),
            Err(SessionError::SessionNotFound) => {
                debug!("Request carried an unknown or expired session");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.mode.bypasses_authentication() {
            return Ok(Self::development(state));
        }

        Self::from_cookie(parts, state)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Not authenticated, please log in"))
    }
}

/// Any authenticated caller: a session, a bearer token or the development bypass
#[derive(Debug, Clone)]
pub enum Caller {
    Session(SessionUser),
    Token(Claims),
    Development(SessionUser),
}

impl Caller {
    pub fn subject(&self) -> &str {
        match self {
            Caller::Session(user) | Caller::Development(user) => &user.sub,
            Caller::Token(claims) => &claims.sub,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Caller::Session(_) => "session",
            Caller::Token(_) => "token",
            Caller::Development(_) => "development",
        }
    }

    /// Groups the caller acts for
    pub fn groups(&self) -> Vec<i32> {
        match self {
            Caller::Session(user) | Caller::Development(user) => user.groups.clone(),
            Caller::Token(claims) => vec![claims.group_id],
        }
    }

    /// Administrators, and tokens scoped to the admin group, have full access
    pub fn has_access(&self, policy: &GroupPolicy) -> bool {
        match self {
            Caller::Session(user) | Caller::Development(user) => policy.is_admin(&user.groups),
            Caller::Token(claims) => claims.group_id == policy.admin_group_id(),
        }
    }
}

/// Token from an `Authorization: Bearer` header, if the header is present
fn bearer_token(parts: &Parts) -> Option<Result<&str, ApiError>> {
    let header = parts.headers.get(AUTHORIZATION)?;
    let token = match header.to_str() {
        Ok(value) if value.len() > 7 && value[..7].eq_ignore_ascii_case("bearer ") => {
            Ok(value[7..].trim())
        }
        Ok(_) => {
            warn!("Invalid Authorization header format, missing 'Bearer ' prefix");
            Err(ApiError::unauthorized("Invalid Authorization header"))
        }
        Err(e) => {
            warn!("Failed to parse Authorization header to string: {}", e);
            Err(ApiError::unauthorized("Invalid Authorization header"))
        }
    };
    Some(token)
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.mode.bypasses_authentication() {
            return Ok(Caller::Development(SessionUser::development(state)));
        }

        if let Some(token) = bearer_token(parts) {
            let claims = state.tokens.verify(token?).map_err(|e| {
                warn!("Rejected bearer token: {}", e);
                ApiError::from(e)
            })?;
            return Ok(Caller::Token(claims));
        }

        SessionUser::from_cookie(parts, state)
            .await?
            .map(Caller::Session)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}
