//! Account registration, login and token lifecycle.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::auth::{
    AuthError, TokenIssuer, TokenKind, hash_password, verify_password,
};
use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::{PublicUser, UserRecord};
use crate::domain::types::UserRole;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("a user with this phone number already exists")]
    PhoneTaken,
    #[error("no user with this phone number")]
    UnknownPhone,
    #[error("invalid password")]
    InvalidPassword,
    #[error("not authenticated")]
    Unauthorized,
}

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub password: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// The authenticated caller, inserted into request extensions by the auth
/// middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_hr(&self) -> bool {
        self.role == UserRole::Hr
    }
}

impl From<&UserRecord> for AuthUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UsersRepo>,
    tokens: Arc<TokenIssuer>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UsersRepo>, tokens: Arc<TokenIssuer>) -> Self {
        Self { repo, tokens }
    }

    pub async fn register(&self, cmd: RegisterCommand) -> Result<PublicUser, UserServiceError> {
        let phone_number = cmd.phone_number.trim().to_string();
        if self.repo.find_user_by_phone(&phone_number).await?.is_some() {
            return Err(UserServiceError::PhoneTaken);
        }

        let password_hash = hash_password(&cmd.password, self.tokens.bcrypt_cost()).await?;
        let user = self
            .repo
            .create_user(CreateUserParams {
                name: cmd.name.trim().to_string(),
                phone_number,
                role: cmd.role,
                password_hash,
                note: cmd.note.unwrap_or_default(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => UserServiceError::PhoneTaken,
                other => UserServiceError::Repo(other),
            })?;

        info!(user_id = user.id, role = %user.role, "user registered");
        Ok(PublicUser::from(&user))
    }

    /// Verify credentials, issue both tokens and persist the refresh token.
    pub async fn login(
        &self,
        phone_number: &str,
        password: &str,
    ) -> Result<LoginOutcome, UserServiceError> {
        let user = self
            .repo
            .find_user_by_phone(phone_number.trim())
            .await?
            .ok_or(UserServiceError::UnknownPhone)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(UserServiceError::InvalidPassword);
        }

        let access_token = self.tokens.issue(TokenKind::Access, &user)?;
        let refresh_token = self.tokens.issue(TokenKind::Refresh, &user)?;
        self.repo
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;

        info!(user_id = user.id, "user logged in");
        Ok(LoginOutcome {
            user: PublicUser::from(&user),
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token. The token must verify
    /// and match the one stored for the user.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, UserServiceError> {
        let claims = self
            .tokens
            .verify(TokenKind::Refresh, refresh_token)
            .map_err(|_| UserServiceError::Unauthorized)?;
        let user_id = claims
            .user_id()
            .map_err(|_| UserServiceError::Unauthorized)?;
        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(UserServiceError::Unauthorized)?;

        if user.refresh_token.as_deref() != Some(refresh_token) {
            return Err(UserServiceError::Unauthorized);
        }

        Ok(self.tokens.issue(TokenKind::Access, &user)?)
    }

    pub async fn logout(&self, user: &AuthUser) -> Result<(), UserServiceError> {
        self.repo.set_refresh_token(user.id, None).await?;
        info!(user_id = user.id, "user logged out");
        Ok(())
    }

    /// Resolve an access token to the user it was issued for.
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthUser, UserServiceError> {
        let claims = self
            .tokens
            .verify(TokenKind::Access, access_token)
            .map_err(|_| UserServiceError::Unauthorized)?;
        let user_id = claims
            .user_id()
            .map_err(|_| UserServiceError::Unauthorized)?;
        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(UserServiceError::Unauthorized)?;
        Ok(AuthUser::from(&user))
    }
}
