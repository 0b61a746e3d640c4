use crate::api::security::models::{
    CallbackQuery, CallerResponse, IntrospectionRequest, IntrospectionResponse, LoginQuery,
    LogoutResponse, SessionResponse, TokenRequest, TokenResponse,
};
use crate::auth::extract::{Caller, SessionUser, SESSION_COOKIE};
use crate::auth::identity::IdentityBroker;
use crate::auth::session::{code_challenge, generate_code_verifier, Session};
use crate::auth::token::{now, validate_request};
use crate::errors::ApiError;
use crate::headers::presets;
use crate::openapi::SECURITY_TAG;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use log::{info, warn};
use std::sync::Arc;

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            sub: session.sub,
            name: session.name,
            email: session.email,
            groups: session.groups,
            expires_at: session.expires_at,
        }
    }
}

fn identity_broker(state: &AppState) -> Result<&Arc<IdentityBroker>, ApiError> {
    state
        .identity
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Login is not configured on this server"))
}

/// Only local absolute paths are accepted, so a login cannot be used as an
/// open redirect.
fn validate_return_url(return_url: String) -> Result<String, ApiError> {
    let local = return_url.starts_with('/')
        && !return_url.starts_with("//")
        && !return_url.contains('\\')
        && !return_url.chars().any(char::is_control);
    if local {
        Ok(return_url)
    } else {
        warn!("Rejected login return_url '{}'", return_url);
        Err(ApiError::bad_request("return_url must be a path on this server"))
    }
}

fn session_cookie(state: &AppState, session_id: String, session: &Session) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.settings.session.cookie_secure)
        .max_age(time::Duration::seconds(session.expires_at - session.issued_at))
        .build()
}

/// Start a login at the identity provider
#[utoipa::path(
    get,
    path = "/security/login",
    tag = SECURITY_TAG,
    params(LoginQuery),
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 400, description = "return_url is not a local path"),
        (status = 503, description = "Login is not configured")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<LoginQuery>, ApiError>,
) -> Result<Redirect, ApiError> {
    let identity = identity_broker(&state)?;
    let return_url = query.return_url.map(validate_return_url).transpose()?;

    let code_verifier = identity.uses_pkce().then(generate_code_verifier);
    let challenge = code_verifier.as_deref().map(code_challenge);
    let login_state = state.sessions.begin_login(code_verifier, return_url).await?;

    let url = identity.authorization_url(&login_state, challenge.as_deref());
    Ok(Redirect::to(url.as_str()))
}

/// Finish a login: the identity provider redirects the browser here
#[utoipa::path(
    get,
    path = "/security/callback",
    tag = SECURITY_TAG,
    params(CallbackQuery),
    responses(
        (status = 200, description = "Session established", body = SessionResponse),
        (status = 303, description = "Session established, redirect to return_url"),
        (status = 400, description = "Missing parameters or unknown login state"),
        (status = 401, description = "The identity provider rejected the login"),
        (status = 502, description = "The identity provider could not be reached")
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Query(query), _): WithRejection<Query<CallbackQuery>, ApiError>,
) -> Result<Response, ApiError> {
    if let Some(error) = query.error {
        let reason = query.error_description.unwrap_or(error);
        warn!("Identity provider reported a failed login: {}", reason);
        return Err(ApiError::unauthorized(format!("Login failed: {reason}")));
    }

    let identity = identity_broker(&state)?;
    let (Some(code), Some(login_state)) = (query.code, query.state) else {
        return Err(ApiError::bad_request("Missing code or state"));
    };

    let pending = state.sessions.complete_login(&login_state).await?;
    let user = identity
        .authenticate(&code, pending.code_verifier.as_deref())
        .await?;

    // A new login replaces whatever session the browser had
    if let Some(previous) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy_session(previous.value()).await?;
    }

    let groups = state.groups.groups_for(&user.sub, user.email.as_deref());
    let (session_id, session) = state
        .sessions
        .create_session(&user.sub, user.name, user.email, groups)
        .await?;
    info!(
        "User '{}' logged in with groups {:?}",
        session.sub, session.groups
    );

    let jar = jar.add(session_cookie(&state, session_id, &session));
    let response = match pending.return_url {
        Some(return_url) => (jar, Redirect::to(&return_url)).into_response(),
        None => (jar, Json(SessionResponse::from(session))).into_response(),
    };
    Ok(response)
}

/// End the current session
#[utoipa::path(
    get,
    path = "/security/logout",
    tag = SECURITY_TAG,
    responses(
        (status = 200, description = "Session destroyed", body = LogoutResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy_session(cookie.value()).await?;
        info!("Session logged out");
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((
        jar,
        Json(LogoutResponse {
            detail: "Logged out".to_string(),
        }),
    ))
}

/// Issue a bearer token scoped to a group
#[utoipa::path(
    post,
    path = "/security/token",
    tag = SECURITY_TAG,
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Malformed request, invalid group or expiration not in the future"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not allowed to issue tokens for this group")
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    user: SessionUser,
    WithRejection(Json(request), _): WithRejection<Json<TokenRequest>, ApiError>,
) -> Result<Response, ApiError> {
    validate_request(request.group_id, request.expiration, now())?;

    if !state.groups.may_issue(&user.groups, request.group_id) {
        warn!(
            "User '{}' may not issue tokens for group {}",
            user.sub, request.group_id
        );
        return Err(ApiError::forbidden(format!(
            "Not allowed to issue tokens for group {}",
            request.group_id
        )));
    }

    let issued = state
        .tokens
        .issue(&user.sub, request.group_id, request.expiration)?;
    info!(
        "Issued token {} for '{}' scoped to group {} until {}",
        issued.claims.jti, user.sub, issued.claims.group_id, issued.claims.exp
    );

    let mut response = Json(TokenResponse {
        access_token: issued.token,
        token_type: "bearer".to_string(),
        group_id: issued.claims.group_id,
        expires_at: issued.claims.exp,
    })
    .into_response();
    presets::no_store().apply(&mut response);
    Ok(response)
}

/// Check whether a token is currently valid
#[utoipa::path(
    post,
    path = "/security/token/introspect",
    tag = SECURITY_TAG,
    request_body = IntrospectionRequest,
    responses(
        (status = 200, description = "Introspection result", body = IntrospectionResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn introspect(
    State(state): State<AppState>,
    _caller: Caller,
    WithRejection(Json(request), _): WithRejection<Json<IntrospectionRequest>, ApiError>,
) -> Response {
    let body = match state.tokens.verify(&request.token) {
        Ok(claims) => IntrospectionResponse {
            active: true,
            sub: Some(claims.sub),
            group_id: Some(claims.group_id),
            exp: Some(claims.exp),
            iat: Some(claims.iat),
        },
        Err(e) => {
            info!("Introspected an inactive token: {}", e);
            IntrospectionResponse::inactive()
        }
    };

    let mut response = Json(body).into_response();
    presets::no_store().apply(&mut response);
    response
}

/// Describe the authenticated caller
#[utoipa::path(
    get,
    path = "/security/me",
    tag = SECURITY_TAG,
    responses(
        (status = 200, description = "The caller", body = CallerResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(State(state): State<AppState>, caller: Caller) -> Response {
    let mut response = Json(CallerResponse {
        sub: caller.subject().to_string(),
        kind: caller.kind().to_string(),
        groups: caller.groups(),
        has_access: caller.has_access(&state.groups),
        deployment_mode: state.mode.to_string(),
    })
    .into_response();
    presets::private_no_cache().apply(&mut response);
    response
}
