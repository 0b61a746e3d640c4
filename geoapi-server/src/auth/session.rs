//! Login sessions and pending OAuth logins, kept in the shared cache

use crate::auth::token::now;
use crate::cache::{Cache, CacheBackend, CacheError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

/// Pending logins must complete within this window
pub const LOGIN_STATE_TTL: u64 = 600;

/// Errors that can occur during session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Session not found or expired")]
    SessionNotFound,
    #[error("Login state not found or expired")]
    LoginStateNotFound,
    #[error("Session lifetime of {0}s is out of range")]
    InvalidTtl(u64),
}

/// The identity an authenticated browser session is bound to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Provider subject identifier
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Groups resolved when the session was created
    pub groups: Vec<i32>,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// State kept between the login redirect and the provider callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingLogin {
    /// PKCE code verifier, absent when PKCE is disabled
    pub code_verifier: Option<String>,
    /// Local path to send the browser to after login
    pub return_url: Option<String>,
    pub expires_at: i64,
}

/// Creates, resolves and destroys sessions and pending logins
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache,
    session_ttl: u64,
}

impl SessionStore {
    pub fn new(cache: Cache, session_ttl: u64) -> Self {
        Self { cache, session_ttl }
    }

    pub fn session_ttl(&self) -> u64 {
        self.session_ttl
    }

    /// Create a session for an authenticated identity, returning its id
    pub async fn create_session(
        &self,
        sub: &str,
        name: Option<String>,
        email: Option<String>,
        groups: Vec<i32>,
    ) -> Result<(String, Session), SessionError> {
        let now = now();
        let expires_at = i64::try_from(self.session_ttl)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or(SessionError::InvalidTtl(self.session_ttl))?;

        let session_id = generate_secure_id();
        let session = Session {
            sub: sub.to_string(),
            name,
            email,
            groups,
            issued_at: now,
            expires_at,
        };

        self.cache
            .set(
                &session_key(&session_id),
                &session,
                Duration::from_secs(self.session_ttl),
            )
            .await?;

        debug!(
            "Created session for '{}' with {} groups, expires in {}s",
            session.sub,
            session.groups.len(),
            self.session_ttl
        );

        Ok((session_id, session))
    }

    /// Resolve a session id to its session
    pub async fn get_session(&self, session_id: &str) -> Result<Session, SessionError> {
        let key = session_key(session_id);
        let session: Session = self
            .cache
            .get(&key)
            .await?
            .ok_or(SessionError::SessionNotFound)?;

        if now() >= session.expires_at {
            if let Err(e) = self.cache.delete(&key).await {
                warn!("Failed to delete expired session from cache: {}", e);
            }
            return Err(SessionError::SessionNotFound);
        }

        Ok(session)
    }

    /// Destroy a session. Unknown ids are not an error.
    pub async fn destroy_session(&self, session_id: &str) -> Result<(), SessionError> {
        self.cache.delete(&session_key(session_id)).await?;
        Ok(())
    }

    /// Record a login in progress and return the `state` value identifying it
    pub async fn begin_login(
        &self,
        code_verifier: Option<String>,
        return_url: Option<String>,
    ) -> Result<String, SessionError> {
        let state = generate_secure_id();
        let pending = PendingLogin {
            code_verifier,
            return_url,
            expires_at: now() + LOGIN_STATE_TTL as i64,
        };
        self.cache
            .set(
                &login_key(&state),
                &pending,
                Duration::from_secs(LOGIN_STATE_TTL),
            )
            .await?;
        Ok(state)
    }

    /// Consume a pending login. Each `state` works once, even when callbacks
    /// race.
    pub async fn complete_login(&self, state: &str) -> Result<PendingLogin, SessionError> {
        let pending: PendingLogin = self
            .cache
            .take(&login_key(state))
            .await?
            .ok_or(SessionError::LoginStateNotFound)?;

        if now() >= pending.expires_at {
            return Err(SessionError::LoginStateNotFound);
        }

        Ok(pending)
    }
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

fn login_key(state: &str) -> String {
    format!("login_state:{}", state)
}

/// 32 random bytes, base64url encoded
pub(crate) fn generate_secure_id() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Fresh PKCE code verifier (RFC 7636 section 4.1)
pub(crate) fn generate_code_verifier() -> String {
    generate_secure_id()
}

/// S256 code challenge for a verifier (RFC 7636 section 4.2)
pub(crate) fn code_challenge(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
