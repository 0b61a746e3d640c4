use crate::auth::identity::IdentityError;
use crate::auth::session::SessionError;
use crate::auth::token::TokenError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use log::error;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub detail: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a detail message and status code
    pub fn new<S: ToString>(detail: S, status_code: StatusCode) -> Self {
        Self {
            detail: detail.to_string(),
            status_code,
        }
    }

    /// Create new Internal Server Error (500) with a detail message
    pub fn internal<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create new Bad Request Error (400) with a detail message
    pub fn bad_request<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_REQUEST)
    }

    /// Create new Unauthorized Error (401) with a detail message
    pub fn unauthorized<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::UNAUTHORIZED)
    }

    /// Create new Forbidden Error (403) with a detail message
    pub fn forbidden<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::FORBIDDEN)
    }

    /// Create new Bad Gateway (502) with a detail message
    pub fn bad_gateway<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::BAD_GATEWAY)
    }

    /// Create new Service Unavailable (503) with a detail message
    pub fn service_unavailable<S: ToString>(detail: S) -> Self {
        Self::new(detail, StatusCode::SERVICE_UNAVAILABLE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "detail": self.detail,
        });
        (status_code, Json(body)).into_response()
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidGroup(_) | TokenError::ExpirationNotInFuture { .. } => {
                Self::bad_request(err)
            }
            TokenError::Expired | TokenError::Invalid(_) => Self::unauthorized(err),
            TokenError::EmptySecret
            | TokenError::UnsupportedAlgorithm(_)
            | TokenError::Signing(_) => {
                error!("Token issuer failure: {}", err);
                Self::internal("Failed to issue token")
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected { .. } => {
                Self::unauthorized("The identity provider rejected the login")
            }
            IdentityError::Http(_) | IdentityError::InvalidResponse(_) => {
                error!("Identity provider failure: {}", err);
                Self::bad_gateway("Failed to reach the identity provider")
            }
            IdentityError::Client(_) => {
                error!("Identity client failure: {}", err);
                Self::internal("Identity provider client is unavailable")
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SessionNotFound => Self::unauthorized("Session not found or expired"),
            SessionError::LoginStateNotFound => {
                Self::bad_request("Unknown or expired login state, please log in again")
            }
            SessionError::Cache(e) => {
                error!("Session store failure: {}", e);
                Self::internal("Session store is unavailable")
            }
            SessionError::InvalidTtl(ttl) => {
                error!("Cannot create session with lifetime {}s", ttl);
                Self::internal("Session could not be created")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
