//! Bearer token issuance and verification (HS256 JWT), and the `CurrentUser` extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::models::UserIdentity;
use crate::store::UserDirectory;
use crate::AppState;

/// Issued tokens are valid for seven days.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i32,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(secret: &[u8], user_id: i32) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token_with_ttl(secret, user_id, TOKEN_TTL_SECS)
}

pub fn issue_token_with_ttl(
    secret: &[u8],
    user_id: i32,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        user_id,
        iat: now,
        exp: now + ttl_secs,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
}

/// Resolves an opaque bearer token to the user it was issued for.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserIdentity, ChatError>;
}

/// Checks signature and expiry, then requires the subject to still exist.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
    users: Arc<dyn UserDirectory>,
}

impl JwtVerifier {
    pub fn new(secret: &[u8], users: Arc<dyn UserDirectory>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            users,
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<UserIdentity, ChatError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ChatError::InvalidToken
            })?
            .claims;

        match self.users.find_user(claims.user_id) {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                tracing::debug!(user_id = claims.user_id, "token subject no longer exists");
                Err(ChatError::InvalidToken)
            }
            Err(e) => {
                tracing::error!(user_id = claims.user_id, "user lookup during token check: {:?}", e);
                Err(ChatError::InvalidToken)
            }
        }
    }
}

/// Run `verifier` on the blocking pool: the subject lookup may wait on the database.
pub async fn verify_blocking(
    verifier: Arc<dyn TokenVerifier>,
    token: String,
) -> Result<UserIdentity, ChatError> {
    tokio::task::spawn_blocking(move || verifier.verify(&token))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("token check task: {:?}", e);
            Err(ChatError::InvalidToken)
        })
}

/// The authenticated caller of a REST endpoint, from `Authorization: Bearer <token>`.
pub struct CurrentUser(pub UserIdentity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or((StatusCode::UNAUTHORIZED, "Access token required"))?;

        verify_blocking(state.verifier.clone(), token.to_string())
            .await
            .map(CurrentUser)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid token"))
    }
}
