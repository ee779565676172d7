use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    entities::users::InsertUserEntity,
    errors::{RepositoryError, ValidationError},
    repositories::users::UserRepository,
    value_objects::users::{SignInModel, SignUpModel, UserModel, normalize_email},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    auth::{TokenService, password},
    axum_http::error_responses::AppError,
};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User already exists")]
    EmailTaken,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidCredentials,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccountError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::EmailTaken => StatusCode::CONFLICT,
            AccountError::UserNotFound => StatusCode::NOT_FOUND,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken => AppError::Conflict(err.to_string()),
            AccountError::UserNotFound => AppError::NotFound(err.to_string()),
            AccountError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            AccountError::Validation(_) => AppError::BadRequest(err.to_string()),
            AccountError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

/// A freshly issued session token together with the signed-in profile.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserModel,
}

pub struct AccountUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repository: Arc<U>,
    token_service: Arc<TokenService>,
}

impl<U> AccountUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repository: Arc<U>, token_service: Arc<TokenService>) -> Self {
        Self {
            user_repository,
            token_service,
        }
    }

    pub fn session_ttl_seconds(&self) -> u64 {
        self.token_service.ttl_seconds()
    }

    pub async fn sign_up(
        &self,
        sign_up_model: SignUpModel,
        now: DateTime<Utc>,
    ) -> Result<AuthSession, AccountError> {
        let sign_up_model = sign_up_model.normalized()?;

        let existing = self
            .user_repository
            .find_by_email(sign_up_model.email.clone())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "accounts: failed to check email");
                AccountError::Internal(err)
            })?;
        if existing.is_some() {
            warn!("accounts: sign-up with an email already in use");
            return Err(AccountError::EmailTaken);
        }

        let password_hash = password::hash_password(&sign_up_model.password)?;

        let user = self
            .user_repository
            .create(InsertUserEntity {
                name: sign_up_model.name,
                email: sign_up_model.email,
                password_hash,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| match RepositoryError::find(&err) {
                Some(RepositoryError::UniqueViolation(_)) => {
                    warn!("accounts: email taken by a concurrent sign-up");
                    AccountError::EmailTaken
                }
                _ => {
                    error!(db_error = ?err, "accounts: failed to create user");
                    AccountError::Internal(err)
                }
            })?;

        let token = self.token_service.issue(user.id, now)?;
        info!(user_id = %user.id, "accounts: user signed up");

        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    pub async fn sign_in(
        &self,
        sign_in_model: SignInModel,
        now: DateTime<Utc>,
    ) -> Result<AuthSession, AccountError> {
        let email = normalize_email(&sign_in_model.email)?;

        let user = self
            .user_repository
            .find_by_email(email)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "accounts: failed to load user by email");
                AccountError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!("accounts: sign-in for unknown email");
                AccountError::UserNotFound
            })?;

        if !password::verify_password(&sign_in_model.password, &user.password_hash)? {
            warn!(user_id = %user.id, "accounts: sign-in with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.token_service.issue(user.id, now)?;
        info!(user_id = %user.id, "accounts: user signed in");

        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }
}
