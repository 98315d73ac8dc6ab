//! Access and refresh token issuance and verification (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::db::TokenPair;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid or expired token")]
    Invalid,

    #[error("Wrong token type, expected {expected}")]
    WrongType { expected: TokenType },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub token_type: TokenType,
    /// Unique token id
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::minutes(config.access_token_minutes),
            Duration::days(config.refresh_token_days),
        )
    }

    fn issue(&self, user_id: i64, username: &str, token_type: TokenType) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    pub fn issue_access(&self, user_id: i64, username: &str) -> Result<String, TokenError> {
        self.issue(user_id, username, TokenType::Access)
    }

    pub fn issue_pair(&self, user_id: i64, username: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(user_id, username, TokenType::Access)?,
            refresh: self.issue(user_id, username, TokenType::Refresh)?,
        })
    }

    /// Decode `token`, checking signature, expiry and token type
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?;

        if data.claims.token_type != expected {
            return Err(TokenError::WrongType { expected });
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::minutes(5), Duration::days(1))
    }

    #[test]
    fn test_pair_round_trip() {
        let svc = service();
        let pair = svc.issue_pair(42, "driver").unwrap();

        let access = svc.verify(&pair.access, TokenType::Access).unwrap();
        assert_eq!(access.user_id(), Some(42));
        assert_eq!(access.username, "driver");

        let refresh = svc.verify(&pair.refresh, TokenType::Refresh).unwrap();
        assert_eq!(refresh.user_id(), Some(42));
        assert!(refresh.exp > access.exp);
        assert_ne!(refresh.jti, access.jti);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let svc = service();
        let pair = svc.issue_pair(1, "driver").unwrap();

        assert!(matches!(
            svc.verify(&pair.access, TokenType::Refresh),
            Err(TokenError::WrongType {
                expected: TokenType::Refresh
            })
        ));
        assert!(svc.verify(&pair.refresh, TokenType::Access).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the default 60s validation leeway
        let svc = TokenService::new("test-secret", Duration::minutes(-5), Duration::days(1));
        let token = svc.issue_access(1, "driver").unwrap();

        assert!(matches!(
            svc.verify(&token, TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = TokenService::new("other-secret", Duration::minutes(5), Duration::days(1));
        let token = other.issue_access(1, "driver").unwrap();

        assert!(service().verify(&token, TokenType::Access).is_err());
        assert!(service().verify("not.a.jwt", TokenType::Access).is_err());
    }
}
