use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Caller identity taken from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Bearer token")]
    MissingBearer,

    #[error("Invalid token")]
    InvalidToken,

    #[error("invalid admin key")]
    InvalidAdminKey,
}

pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Deserialize)]
struct Claims {
    id: Option<Value>,
    sub: Option<Value>,
    email: Option<String>,
    display_name: Option<String>,
}

/// HS256 token verifier. `exp` is checked when the token carries one.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;

        // Custom `id` claim first, standard `sub` otherwise
        let id = match claims.id.or(claims.sub) {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(AuthError::InvalidToken),
        };

        Ok(Identity {
            id,
            email: claims.email,
            display_name: claims.display_name,
        })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingBearer)
}

/// Shared secret guarding administrative actions.
#[derive(Clone)]
pub struct AdminKey(String);

impl AdminKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn check(&self, presented: Option<&str>) -> Result<(), AuthError> {
        match presented {
            Some(key) if !key.is_empty() && key == self.0 => Ok(()),
            _ => Err(AuthError::InvalidAdminKey),
        }
    }
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminKey(..)")
    }
}
