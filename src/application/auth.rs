//! Password hashing and JWT issuance/verification.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::UserRecord;
use crate::domain::types::UserRole;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is invalid")]
    InvalidToken,
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("`{key}` must be configured")]
    MissingSecret { key: &'static str },
}

/// The two token families; each is signed with its own secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Secrets and lifetimes for issued tokens.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

impl TryFrom<&crate::config::AuthSettings> for TokenConfig {
    type Error = AuthError;

    fn try_from(settings: &crate::config::AuthSettings) -> Result<Self, Self::Error> {
        let access_secret = settings
            .access_token_secret
            .clone()
            .ok_or(AuthError::MissingSecret {
                key: "auth.access_token_secret",
            })?;
        let refresh_secret = settings
            .refresh_token_secret
            .clone()
            .ok_or(AuthError::MissingSecret {
                key: "auth.refresh_token_secret",
            })?;

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl: settings.access_token_ttl,
            refresh_ttl: settings.refresh_token_ttl,
            bcrypt_cost: settings.bcrypt_cost,
        })
    }
}

#[derive(Clone, Debug)]
pub struct TokenIssuer {
    config: TokenConfig,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.config.bcrypt_cost
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.config.access_secret.as_bytes(),
            TokenKind::Refresh => self.config.refresh_secret.as_bytes(),
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.config.access_ttl,
            TokenKind::Refresh => self.config.refresh_ttl,
        }
    }

    pub fn issue(&self, kind: TokenKind, user: &UserRecord) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = i64::try_from(self.ttl(kind).as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now,
            exp: now.saturating_add(ttl),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
        .map_err(|err| AuthError::Signing(err.to_string()))
    }

    /// Check the signature with the secret of `kind`, then the expiry.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against the `time` clock
        validation.validate_exp = false;
        validation.required_spec_claims = ["exp".to_string()].into_iter().collect();

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &validation,
        )
        .map_err(|_| AuthError::InvalidToken)?;

        if data.claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(data.claims)
    }
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|err| AuthError::Hashing(err.to_string()))?
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| AuthError::Hashing(err.to_string()))?
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(TokenConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            access_ttl: Duration::from_secs(86_400),
            refresh_ttl: Duration::from_secs(7 * 86_400),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        })
    }

    fn user() -> UserRecord {
        let now = OffsetDateTime::now_utc();
        UserRecord {
            id: 12,
            name: "Asha".into(),
            phone_number: "9876543210".into(),
            role: UserRole::Hr,
            password_hash: String::new(),
            note: String::new(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies_with_claims() {
        let issuer = issuer();
        let token = issuer.issue(TokenKind::Access, &user()).unwrap();
        let claims = issuer.verify(TokenKind::Access, &token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 12);
        assert_eq!(claims.role, UserRole::Hr);
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn token_kinds_use_separate_secrets() {
        let issuer = issuer();
        let refresh = issuer.issue(TokenKind::Refresh, &user()).unwrap();
        assert!(matches!(
            issuer.verify(TokenKind::Access, &refresh),
            Err(AuthError::InvalidToken)
        ));
        assert!(issuer.verify(TokenKind::Refresh, &refresh).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut config = issuer().config;
        config.access_ttl = Duration::ZERO;
        let issuer = TokenIssuer::new(config);
        let token = issuer.issue(TokenKind::Access, &user()).unwrap();
        assert!(matches!(
            issuer.verify(TokenKind::Access, &token),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(
            issuer().verify(TokenKind::Access, "not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn token_config_requires_both_secrets() {
        let settings = crate::config::AuthSettings {
            access_token_secret: Some("a".into()),
            refresh_token_secret: None,
            access_token_ttl: Duration::from_secs(60),
            refresh_token_ttl: Duration::from_secs(120),
            bcrypt_cost: 4,
        };
        assert!(matches!(
            TokenConfig::try_from(&settings),
            Err(AuthError::MissingSecret {
                key: "auth.refresh_token_secret"
            })
        ));
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("secret1", 4).await.unwrap();
        assert!(verify_password("secret1", &hash).await.unwrap());
        assert!(!verify_password("secret2", &hash).await.unwrap());
    }
}
