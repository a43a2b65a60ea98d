//! Request authentication: bearer token → user id.

use axum::http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};

use crate::error::AuthError;

/// Resolves a bearer token to the user it belongs to.
pub trait AuthVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<String, AuthError>;
}

/// Fixed token table loaded from configuration.
pub struct StaticTokenVerifier {
    tokens: Vec<(SecretString, String)>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: Vec<(SecretString, String)>) -> Self {
        Self { tokens }
    }
}

impl AuthVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<String, AuthError> {
        self.tokens
            .iter()
            .find(|(secret, _)| secret.expose_secret() == token)
            .map(|(_, user)| user.clone())
            .ok_or(AuthError::InvalidToken)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}
