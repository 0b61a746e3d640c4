use crate::api::security::models::{
    CallerResponse, IntrospectionRequest, IntrospectionResponse, LogoutResponse,
    SessionResponse, TokenRequest, TokenResponse,
};
use crate::api::{health, security::handlers};
use crate::state::AppState;
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const SECURITY_TAG: &str = "Security API";

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::ready_check,
        handlers::login,
        handlers::callback,
        handlers::logout,
        handlers::issue_token,
        handlers::introspect,
        handlers::me,
    ),
    components(schemas(
        CallerResponse,
        IntrospectionRequest,
        IntrospectionResponse,
        LogoutResponse,
        SessionResponse,
        TokenRequest,
        TokenResponse,
    )),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = SECURITY_TAG, description = "Login, sessions and group-scoped tokens"),
    ),
    info(
        title = "GeoAPI",
        description = "Authentication gateway of the geological data API",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;

/// Creates a router serving the OpenAPI document
pub(crate) fn router() -> Router<AppState> {
    Router::new().route(
        "/openapi.json",
        get(async || Json(ApiDoc::openapi())),
    )
}
