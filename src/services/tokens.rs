// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token issuance and verification.
//!
//! Both kinds are HS256 JWTs with separate keys and lifetimes. Every token
//! carries a random `jti`, so two tokens issued for the same user in the same
//! second still differ and rotation can detect replays.

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;
use crate::time_utils::unix_now;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Claims of a short-lived access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims of a long-lived refresh token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies both token kinds.
#[derive(Clone)]
pub struct TokenIssuer {
    access_key: Vec<u8>,
    access_ttl_secs: i64,
    refresh_key: Vec<u8>,
    refresh_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(
        access_key: Vec<u8>,
        access_ttl_secs: i64,
        refresh_key: Vec<u8>,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            access_key,
            access_ttl_secs,
            refresh_key,
            refresh_ttl_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.access_token_secret.clone(),
            config.access_token_expiry_secs,
            config.refresh_token_secret.clone(),
            config.refresh_token_expiry_secs,
        )
    }

    /// Issue a new access/refresh pair for `user`.
    ///
    /// Any failure is reported as a single internal error.
    pub fn issue(&self, user: &User) -> Result<TokenPair, AppError> {
        self.try_issue(user).map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "Token generation failed");
            AppError::Internal(anyhow::Error::msg(AppError::TOKEN_GENERATION_FAILED))
        })
    }

    fn try_issue(&self, user: &User) -> anyhow::Result<TokenPair> {
        let now = unix_now();

        let access = AccessClaims {
            sub: user.id.clone(),
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.access_ttl_secs,
        };
        let refresh = RefreshClaims {
            sub: user.id.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs,
        };

        Ok(TokenPair {
            access_token: sign(&access, &self.access_key)?,
            refresh_token: sign(&refresh, &self.refresh_key)?,
        })
    }

    /// Verify signature and expiry of an access token.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AppError> {
        verify(token, &self.access_key)
            .map_err(|_| AppError::unauthorized("Invalid or expired access token"))
    }

    /// Verify signature and expiry of a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AppError> {
        verify(token, &self.refresh_key)
            .map_err(|_| AppError::unauthorized("Invalid refresh token"))
    }
}

fn sign<T: Serialize>(claims: &T, key: &[u8]) -> jsonwebtoken::errors::Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(key),
    )
}

fn verify<T: DeserializeOwned>(token: &str, key: &[u8]) -> jsonwebtoken::errors::Result<T> {
    let key = DecodingKey::from_secret(key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<T>(token, &key, &validation).map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PasswordHash;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"access".to_vec(), 900, b"refresh".to_vec(), 86_400)
    }

    fn user() -> User {
        User {
            id: "user-1".to_string(),
            user_name: "ab".to_string(),
            email: "a@x.com".to_string(),
            full_name: "A B".to_string(),
            avatar: "https://media.example/a.png".to_string(),
            cover_image: None,
            password: PasswordHash::from_phc("$argon2id$stub".to_string()),
            refresh_token: None,
            watch_history: vec![],
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_access_claims_carry_identity() {
        let pair = issuer().issue(&user()).unwrap();
        let claims = issuer().verify_access(&pair.access_token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.user_name, "ab");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.full_name, "A B");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_refresh_claims_carry_only_id() {
        let pair = issuer().issue(&user()).unwrap();
        let claims = issuer().verify_refresh(&pair.refresh_token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let pair = issuer().issue(&user()).unwrap();

        assert!(issuer().verify_access(&pair.refresh_token).is_err());
        assert!(issuer().verify_refresh(&pair.access_token).is_err());
    }

    #[test]
    fn test_consecutive_pairs_differ() {
        let first = issuer().issue(&user()).unwrap();
        let second = issuer().issue(&user()).unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert_ne!(first.access_token, second.access_token);
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = unix_now();
        let claims = RefreshClaims {
            sub: "user-1".to_string(),
            jti: "j".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = sign(&claims, b"refresh").unwrap();

        let err = issuer().verify_refresh(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(issuer().verify_access("invalid.token.here").is_err());
    }
}
