//! Group-scoped bearer tokens

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while issuing or verifying tokens
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Signing secret must not be empty")]
    EmptySecret,
    #[error("{0:?} is not a symmetric signing algorithm")]
    UnsupportedAlgorithm(Algorithm),
    #[error("Group id must be a positive integer, got {0}")]
    InvalidGroup(i32),
    #[error("Expiration {expiration} is not in the future (now: {now})")]
    ExpirationNotInFuture { expiration: i64, now: i64 },
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Claims carried by every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity that issued the token
    pub sub: String,
    /// Authorization group the token is scoped to
    pub group_id: i32,
    /// Expiration, Unix seconds
    pub exp: i64,
    /// Issued at, Unix seconds
    pub iat: i64,
    /// Unique token id
    pub jti: String,
}

/// A freshly minted token and the claims inside it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signs and verifies group-scoped tokens with a shared secret.
///
/// Verification is pinned to the configured algorithm and applies no leeway
/// to `exp`. MAC comparison is constant time inside `jsonwebtoken`.
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(TokenError::UnsupportedAlgorithm(algorithm));
        }
        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Issuer keyed by a random per-process secret
    pub fn ephemeral(algorithm: Algorithm) -> Result<Self, TokenError> {
        let secret: [u8; 32] = rand::thread_rng().gen();
        Self::new(&secret, algorithm)
    }

    /// Issue a token for `group_id` that expires at `expiration` (Unix seconds)
    pub fn issue(
        &self,
        subject: &str,
        group_id: i32,
        expiration: i64,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, group_id, expiration, now())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &str,
        group_id: i32,
        expiration: i64,
        now: i64,
    ) -> Result<IssuedToken, TokenError> {
        validate_request(group_id, expiration, now)?;

        let claims = Claims {
            sub: subject.to_string(),
            group_id,
            exp: expiration,
            iat: now,
            jti: generate_token_id(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!(
            "Issued token {} for '{}' scoped to group {} until {}",
            claims.jti, claims.sub, claims.group_id, claims.exp
        );

        Ok(IssuedToken { token, claims })
    }

    /// Verify the signature and expiration of `token` and return its claims.
    /// A token is expired from its `exp` second onwards.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        // jsonwebtoken still accepts exp == now
        if claims.exp <= now() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

/// Check a requested group and expiration before any token is minted
pub fn validate_request(group_id: i32, expiration: i64, now: i64) -> Result<(), TokenError> {
    if group_id <= 0 {
        return Err(TokenError::InvalidGroup(group_id));
    }
    if expiration <= now {
        return Err(TokenError::ExpirationNotInFuture { expiration, now });
    }
    Ok(())
}

/// Current Unix time in seconds
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn generate_token_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}
