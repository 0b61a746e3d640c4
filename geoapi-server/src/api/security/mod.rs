//! Login through the identity provider, sessions and group-scoped tokens
//!
//! ## Flow
//! 1. `GET /security/login` stores a pending login and redirects the browser
//!    to the provider with a PKCE challenge.
//! 2. `GET /security/callback` exchanges the code, resolves the identity and
//!    sets the `session_id` cookie.
//! 3. `POST /security/token` lets a logged in user mint a bearer token for a
//!    group they may act for.

pub mod handlers;
pub mod models;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Creates the security routes
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/security/login", get(handlers::login))
        .route("/security/callback", get(handlers::callback))
        .route("/security/logout", get(handlers::logout))
        .route("/security/token", post(handlers::issue_token))
        .route("/security/token/introspect", post(handlers::introspect))
        .route("/security/me", get(handlers::me))
}

#[cfg(test)]
mod tests {
    use super::models::{CallerResponse, SessionResponse, TokenResponse};
    use crate::auth::token::now;
    use crate::config::{DeploymentMode, OAuthConfig, Settings};
    use crate::test_utils::TestFixture;
    use http::header::{CACHE_CONTROL, LOCATION};
    use http::StatusCode;
    use serde_json::json;
    use std::collections::HashMap;
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, ResponseTemplate};

    const EXPIRATION: i64 = 1832530128;

    fn token_request(group_id: i32, expiration: i64) -> serde_json::Value {
        json!({ "group_id": group_id, "expiration": expiration })
    }

    #[tokio::test]
    async fn test_login_redirects_to_provider() {
        let fixture = TestFixture::new().await;

        let response = fixture.get("/security/login").await;
        response.assert_status(StatusCode::SEE_OTHER);

        let location = Url::parse(response.header(LOCATION.as_str()).unwrap()).unwrap();
        let params: HashMap<_, _> = location.query_pairs().into_owned().collect();
        assert!(location
            .as_str()
            .starts_with(&format!("{}/authorize", fixture.provider_mock.uri())));
        assert_eq!(params["client_id"], "test-client");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["code_challenge_method"], "S256");
        assert!(!params["state"].is_empty());
    }

    #[tokio::test]
    async fn test_login_rejects_external_return_url() {
        let fixture = TestFixture::new().await;
        for return_url in ["https://evil.example", "//evil.example", "/\\evil.example", "maps"] {
            let response = fixture
                .get(format!(
                    "/security/login?return_url={}",
                    url::form_urlencoded::byte_serialize(return_url.as_bytes()).collect::<String>()
                ))
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_full_login_flow() {
        let fixture = TestFixture::new().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "provider-access-token"
            })))
            .expect(1)
            .mount(&fixture.provider_mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/oauth2/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "http://cilogon.org/serverA/users/7",
                "email": "member@example.org",
                "name": "Member"
            })))
            .expect(1)
            .mount(&fixture.provider_mock)
            .await;

        let state = fixture.start_login("/security/login").await;
        let response = fixture
            .get(format!("/security/callback?code=the-code&state={state}"))
            .await;
        response.assert_ok();

        let session: SessionResponse = response.json_as();
        assert_eq!(session.sub, "http://cilogon.org/serverA/users/7");
        assert_eq!(session.email.as_deref(), Some("member@example.org"));
        assert_eq!(session.groups, vec![7]);

        let set_cookie = response.set_session_cookie().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains(&format!("Max-Age={}", fixture.settings.session.ttl)));

        let cookie = response.session_cookie().unwrap();
        let me = fixture
            .get_with_headers("/security/me", &[("cookie", &cookie)])
            .await;
        me.assert_ok();
        let caller: CallerResponse = me.json_as();
        assert_eq!(caller.kind, "session");
        assert_eq!(caller.groups, vec![7]);
        assert!(!caller.has_access);
    }

    #[tokio::test]
    async fn test_callback_redirects_to_return_url() {
        let fixture = TestFixture::new().await;
        fixture
            .mock_provider_login("sub-1", Some("admin@example.org"))
            .await;

        let state = fixture
            .start_login("/security/login?return_url=%2Fmaps%3Fregion%3D4")
            .await;
        let response = fixture
            .get(format!("/security/callback?code=c&state={state}"))
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header(LOCATION.as_str()), Some("/maps?region=4"));
        assert!(response.session_cookie().is_some());
    }

    #[tokio::test]
    async fn test_callback_with_unknown_state() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .get("/security/callback?code=c&state=forged")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.session_cookie().is_none());
    }

    #[tokio::test]
    async fn test_callback_state_is_single_use() {
        let fixture = TestFixture::new().await;
        fixture.mock_provider_login("sub-1", None).await;
        let state = fixture.start_login("/security/login").await;

        let uri = format!("/security/callback?code=c&state={state}");
        fixture.get(&uri).await.assert_ok();
        fixture.get(&uri).await.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_callback_missing_parameters() {
        let fixture = TestFixture::new().await;
        fixture
            .get("/security/callback?code=c")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_provider_rejection_is_unauthorized() {
        let fixture = TestFixture::new().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&fixture.provider_mock)
            .await;

        let state = fixture.start_login("/security/login").await;
        let response = fixture
            .get(format!("/security/callback?code=bad&state={state}"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_provider_error_parameter_is_unauthorized() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .get("/security/callback?error=access_denied&error_description=User%20cancelled")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json["detail"], "Login failed: User cancelled");
    }

    #[tokio::test]
    async fn test_provider_failure_is_bad_gateway() {
        let fixture = TestFixture::new().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&fixture.provider_mock)
            .await;

        let state = fixture.start_login("/security/login").await;
        fixture
            .get(format!("/security/callback?code=c&state={state}"))
            .await
            .assert_status(StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_issue_admin_token() {
        let fixture = TestFixture::new().await;
        let cookie = fixture.login("admin@example.org").await;

        let response = fixture
            .post_with_headers(
                "/security/token",
                &token_request(1, EXPIRATION),
                &[("cookie", &cookie)],
            )
            .await;
        response.assert_ok();
        assert_eq!(response.header(CACHE_CONTROL.as_str()), Some("no-store"));

        let token: TokenResponse = response.json_as();
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.group_id, 1);
        assert_eq!(token.expires_at, EXPIRATION);

        let claims = fixture.state.tokens.verify(&token.access_token).unwrap();
        assert_eq!(claims.group_id, 1);
        assert_eq!(claims.exp, EXPIRATION);
        assert_eq!(claims.sub, "http://cilogon.org/serverA/users/admin@example.org");
    }

    #[tokio::test]
    async fn test_admin_may_issue_for_other_groups() {
        let fixture = TestFixture::new().await;
        let cookie = fixture.login("admin@example.org").await;

        fixture
            .post_with_headers(
                "/security/token",
                &token_request(42, EXPIRATION),
                &[("cookie", &cookie)],
            )
            .await
            .assert_ok();
    }

    #[tokio::test]
    async fn test_member_is_limited_to_own_groups() {
        let fixture = TestFixture::new().await;
        let cookie = fixture.login("member@example.org").await;

        fixture
            .post_with_headers(
                "/security/token",
                &token_request(7, EXPIRATION),
                &[("cookie", &cookie)],
            )
            .await
            .assert_ok();
        fixture
            .post_with_headers(
                "/security/token",
                &token_request(1, EXPIRATION),
                &[("cookie", &cookie)],
            )
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_issue_token_unauthenticated() {
        let fixture = TestFixture::new().await;
        let response = fixture
            .post("/security/token", &token_request(1, EXPIRATION))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.json["detail"].is_string());
    }

    #[tokio::test]
    async fn test_bearer_token_cannot_mint_tokens() {
        let fixture = TestFixture::new().await;
        let issued = fixture.state.tokens.issue("sub", 1, EXPIRATION).unwrap();
        let authorization = format!("Bearer {}", issued.token);

        fixture
            .post_with_headers(
                "/security/token",
                &token_request(1, EXPIRATION),
                &[("authorization", &authorization)],
            )
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_issue_token_with_past_expiration() {
        let fixture = TestFixture::new().await;
        let cookie = fixture.login("admin@example.org").await;

        for expiration in [now() - 60, 0] {
            fixture
                .post_with_headers(
                    "/security/token",
                    &token_request(1, expiration),
                    &[("cookie", &cookie)],
                )
                .await
                .assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_issue_token_with_invalid_group() {
        let fixture = TestFixture::new().await;
        let cookie = fixture.login("admin@example.org").await;

        fixture
            .post_with_headers(
                "/security/token",
                &token_request(0, EXPIRATION),
                &[("cookie", &cookie)],
            )
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_issue_token_with_malformed_body() {
        let fixture = TestFixture::new().await;
        let cookie = fixture.login("admin@example.org").await;

        let response = fixture
            .post_with_headers(
                "/security/token",
                &json!({ "group_id": "one" }),
                &[("cookie", &cookie)],
            )
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json["detail"].is_string());
    }

    #[tokio::test]
    async fn test_development_mode_issues_without_session() {
        let fixture = TestFixture::with_mode(DeploymentMode::Development).await;

        let response = fixture
            .post("/security/token", &token_request(1, EXPIRATION))
            .await;
        response.assert_ok();

        let token: TokenResponse = response.json_as();
        let claims = fixture.state.tokens.verify(&token.access_token).unwrap();
        assert_eq!(claims.group_id, 1);
        assert_eq!(claims.exp, EXPIRATION);
    }

    #[tokio::test]
    async fn test_production_mode_same_request_fails() {
        let fixture = TestFixture::with_mode(DeploymentMode::Production).await;
        fixture
            .post("/security/token", &token_request(1, EXPIRATION))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_development_without_provider() {
        let provider_mock = wiremock::MockServer::start().await;
        let mut settings = Settings::for_test_with_mocks(&provider_mock);
        settings.environment = Some("development".to_string());
        settings.oauth = OAuthConfig::default();
        let fixture =
            TestFixture::with_settings(settings, DeploymentMode::Development, provider_mock).await;

        fixture
            .get("/security/login")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let caller: CallerResponse = fixture.get("/security/me").await.json_as();
        assert_eq!(caller.kind, "development");
        assert_eq!(caller.deployment_mode, "development");
        assert!(caller.has_access);
    }

    #[tokio::test]
    async fn test_logout() {
        let fixture = TestFixture::new().await;
        let cookie = fixture.login("admin@example.org").await;

        let response = fixture
            .get_with_headers("/security/logout", &[("cookie", &cookie)])
            .await;
        response.assert_ok();
        assert!(response.set_session_cookie().unwrap().contains("Max-Age=0"));

        fixture
            .get_with_headers("/security/me", &[("cookie", &cookie)])
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        fixture
            .post_with_headers(
                "/security/token",
                &token_request(1, EXPIRATION),
                &[("cookie", &cookie)],
            )
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_without_session() {
        let fixture = TestFixture::new().await;
        fixture.get("/security/logout").await.assert_ok();
    }

    #[tokio::test]
    async fn test_relogin_replaces_session() {
        let fixture = TestFixture::new().await;
        let first = fixture.login("member@example.org").await;

        fixture
            .mock_provider_login("sub-2", Some("admin@example.org"))
            .await;
        let state = fixture.start_login("/security/login").await;
        let response = fixture
            .get_with_headers(
                &format!("/security/callback?code=c&state={state}"),
                &[("cookie", &first)],
            )
            .await;
        response.assert_ok();

        fixture
            .get_with_headers("/security/me", &[("cookie", &first)])
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_introspect() {
        let fixture = TestFixture::new().await;
        let cookie = fixture.login("member@example.org").await;
        let issued = fixture.state.tokens.issue("sub", 7, EXPIRATION).unwrap();

        let response = fixture
            .post_with_headers(
                "/security/token/introspect",
                &json!({ "token": issued.token }),
                &[("cookie", &cookie)],
            )
            .await;
        response.assert_ok();
        assert_eq!(response.json["active"], true);
        assert_eq!(response.json["group_id"], 7);
        assert_eq!(response.json["exp"], EXPIRATION);
        assert_eq!(response.header(CACHE_CONTROL.as_str()), Some("no-store"));

        let response = fixture
            .post_with_headers(
                "/security/token/introspect",
                &json!({ "token": "garbage" }),
                &[("cookie", &cookie)],
            )
            .await;
        response.assert_ok();
        assert_eq!(response.json, json!({ "active": false }));
    }

    #[tokio::test]
    async fn test_introspect_requires_caller() {
        let fixture = TestFixture::new().await;
        fixture
            .post("/security/token/introspect", &json!({ "token": "x" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_with_admin_token() {
        let fixture = TestFixture::new().await;
        let issued = fixture.state.tokens.issue("sub", 1, EXPIRATION).unwrap();
        let authorization = format!("Bearer {}", issued.token);

        let response = fixture
            .get_with_headers("/security/me", &[("authorization", &authorization)])
            .await;
        response.assert_ok();

        let caller: CallerResponse = response.json_as();
        assert_eq!(caller.kind, "token");
        assert_eq!(caller.groups, vec![1]);
        assert!(caller.has_access);
        assert_eq!(caller.deployment_mode, "production");
    }
}
