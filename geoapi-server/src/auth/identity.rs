//! OAuth 2.0 / OIDC identity broker client

use crate::config::ProviderEndpoints;
use log::{debug, error, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur while talking to the identity provider
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Identity provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Unexpected identity provider response: {0}")]
    InvalidResponse(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Token endpoint response, only the fields we use
#[derive(Debug, Deserialize)]
struct ProviderTokenResponse {
    access_token: String,
}

/// Identity reported by the userinfo endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Client for the external identity provider
#[derive(Clone)]
pub struct IdentityBroker {
    client: Client,
    endpoints: ProviderEndpoints,
}

impl IdentityBroker {
    pub fn new(endpoints: ProviderEndpoints) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoints.request_timeout))
            .connect_timeout(Duration::from_secs(endpoints.request_timeout.min(5)))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| IdentityError::Client(e.to_string()))?;
        Ok(Self { client, endpoints })
    }

    pub fn uses_pkce(&self) -> bool {
        self.endpoints.use_pkce
    }

    /// URL the browser is redirected to in order to log in
    pub fn authorization_url(&self, state: &str, code_challenge: Option<&str>) -> Url {
        let mut url = self.endpoints.authorization_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.endpoints.client_id)
                .append_pair("redirect_uri", self.endpoints.redirect_uri.as_str())
                .append_pair("scope", &self.endpoints.scopes.join(" "))
                .append_pair("state", state);
            if let Some(challenge) = code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", "S256");
            }
        }
        url
    }

    /// Exchange an authorization code for a provider access token
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<String, IdentityError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.endpoints.redirect_uri.as_str()),
            ("client_id", self.endpoints.client_id.as_str()),
            ("client_secret", self.endpoints.client_secret.as_str()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }

        debug!("Exchanging authorization code at {}", self.endpoints.token_url);

        let response = self
            .client
            .post(self.endpoints.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Token exchange request failed: {}", e);
                IdentityError::Http(e)
            })?;

        let response = reject_unless_success(response, "token exchange").await?;
        let token: ProviderTokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("token response: {e}")))?;

        if token.access_token.is_empty() {
            return Err(IdentityError::InvalidResponse(
                "token response has an empty access_token".to_string(),
            ));
        }
        Ok(token.access_token)
    }

    /// Fetch the identity behind a provider access token
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfo, IdentityError> {
        let response = self
            .client
            .get(self.endpoints.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!("Userinfo request failed: {}", e);
                IdentityError::Http(e)
            })?;

        let response = reject_unless_success(response, "userinfo").await?;
        let user: UserInfo = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("userinfo response: {e}")))?;

        if user.sub.is_empty() {
            return Err(IdentityError::InvalidResponse(
                "userinfo response has an empty sub".to_string(),
            ));
        }
        Ok(user)
    }

    /// Complete a login: exchange the code, then resolve the identity
    pub async fn authenticate(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<UserInfo, IdentityError> {
        let access_token = self.exchange_code(code, code_verifier).await?;
        self.fetch_userinfo(&access_token).await
    }
}

async fn reject_unless_success(
    response: reqwest::Response,
    step: &str,
) -> Result<reqwest::Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Identity provider {} returned {}: {}", step, status, body);
    Err(IdentityError::Rejected {
        status: status.as_u16(),
        body,
    })
}
