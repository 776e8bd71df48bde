use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Token payload. Tokens are issued by the login service; this crate only
/// verifies them (and issues them for tests and tooling).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();
        Self {
            user_id: user_id.into(),
            username: username.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security(secret: &str) -> SecurityConfig {
        SecurityConfig { skip: false, jwt_secret: secret.to_string(), jwt_expiry_hours: 1 }
    }

    #[test]
    fn issued_tokens_validate() {
        let token = generate_jwt(&Claims::new("u1", "lan", 1), &security("s3cret")).unwrap();
        let claims = validate_jwt(&token, &security("s3cret")).unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.username, "lan");
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let token = generate_jwt(&Claims::new("u1", "lan", 1), &security("one")).unwrap();
        assert!(matches!(validate_jwt(&token, &security("two")), Err(JwtError::InvalidToken(_))));

        let mut old = Claims::new("u1", "lan", 1);
        old.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&old, &security("one")).unwrap();
        assert!(validate_jwt(&token, &security("one")).is_err());
    }

    #[test]
    fn requires_a_secret() {
        assert!(matches!(
            generate_jwt(&Claims::new("u1", "lan", 1), &security("")),
            Err(JwtError::InvalidSecret)
        ));
    }
}
