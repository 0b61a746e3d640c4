//! Request and response bodies of the security routes

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query of `GET /security/login`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Local path to return to after login, e.g. `/maps`
    pub return_url: Option<String>,
}

/// Query the identity provider sends to `GET /security/callback`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the login failed
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Summary of the session established by a login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub groups: Vec<i32>,
    /// Unix seconds
    pub expires_at: i64,
}

/// Body of `POST /security/token`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// Group the token is scoped to
    #[schema(example = 1)]
    pub group_id: i32,
    /// Expiration, Unix seconds
    #[schema(example = 1832530128)]
    pub expiration: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
    pub group_id: i32,
    /// Unix seconds
    pub expires_at: i64,
}

/// Body of `POST /security/token/introspect`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntrospectionRequest {
    pub token: String,
}

/// Token introspection result, fields other than `active` are only set for
/// active tokens
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl IntrospectionResponse {
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// Description of the authenticated caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallerResponse {
    pub sub: String,
    /// "session", "token" or "development"
    pub kind: String,
    pub groups: Vec<i32>,
    /// Whether the caller has administrator access
    pub has_access: bool,
    pub deployment_mode: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub detail: String,
}
