use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    entities::users::UpdateUserEntity,
    errors::{RepositoryError, ValidationError},
    repositories::users::UserRepository,
    value_objects::users::{UpdateUserModel, UserModel},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{auth::password, axum_http::error_responses::AppError};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,
    #[error("You can only {0} your own account")]
    Forbidden(&'static str),
    #[error("Email is already in use")]
    EmailTaken,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UserError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Forbidden(_) => StatusCode::FORBIDDEN,
            UserError::EmailTaken => StatusCode::CONFLICT,
            UserError::Validation(_) => StatusCode::BAD_REQUEST,
            UserError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::Forbidden(_) => AppError::Forbidden(err.to_string()),
            UserError::EmailTaken => AppError::Conflict(err.to_string()),
            UserError::Validation(_) => AppError::BadRequest(err.to_string()),
            UserError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

pub struct UserUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repository: Arc<U>,
}

impl<U> UserUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repository: Arc<U>) -> Self {
        Self { user_repository }
    }

    pub async fn list(&self) -> Result<Vec<UserModel>, UserError> {
        let users = self.user_repository.list().await.map_err(|err| {
            error!(db_error = ?err, "users: failed to list users");
            UserError::Internal(err)
        })?;

        Ok(users.into_iter().map(UserModel::from).collect())
    }

    pub async fn get(&self, user_id: Uuid) -> Result<UserModel, UserError> {
        self.user_repository
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to load user");
                UserError::Internal(err)
            })?
            .map(UserModel::from)
            .ok_or(UserError::NotFound)
    }

    pub async fn update(
        &self,
        caller_id: Uuid,
        user_id: Uuid,
        update_user_model: UpdateUserModel,
        now: DateTime<Utc>,
    ) -> Result<UserModel, UserError> {
        if caller_id != user_id {
            warn!(%caller_id, %user_id, "users: update of another account denied");
            return Err(UserError::Forbidden("update"));
        }

        let patch = update_user_model.normalized()?;
        self.get(user_id).await?;

        if let Some(email) = &patch.email {
            let holder = self
                .user_repository
                .find_by_email(email.clone())
                .await
                .map_err(|err| {
                    error!(%user_id, db_error = ?err, "users: failed to check email");
                    UserError::Internal(err)
                })?;

            if holder.is_some_and(|holder| holder.id != user_id) {
                warn!(%user_id, "users: email already in use");
                return Err(UserError::EmailTaken);
            }
        }

        let password_hash = patch
            .password
            .as_deref()
            .map(password::hash_password)
            .transpose()?;

        let updated = self
            .user_repository
            .update(
                user_id,
                UpdateUserEntity {
                    name: patch.name,
                    email: patch.email,
                    password_hash,
                    updated_at: now,
                },
            )
            .await
            .map_err(|err| match RepositoryError::find(&err) {
                Some(RepositoryError::UniqueViolation(_)) => {
                    warn!(%user_id, "users: email taken by a concurrent write");
                    UserError::EmailTaken
                }
                _ => {
                    error!(%user_id, db_error = ?err, "users: failed to update user");
                    UserError::Internal(err)
                }
            })?;

        info!(%user_id, "users: user updated");
        Ok(updated.into())
    }

    /// Removes the account. Its subscriptions go with it through the
    /// `ON DELETE CASCADE` foreign key.
    pub async fn delete(&self, caller_id: Uuid, user_id: Uuid) -> Result<(), UserError> {
        if caller_id != user_id {
            warn!(%caller_id, %user_id, "users: delete of another account denied");
            return Err(UserError::Forbidden("delete"));
        }

        self.get(user_id).await?;

        self.user_repository.delete(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "users: failed to delete user");
            UserError::Internal(err)
        })?;

        info!(%user_id, "users: user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{entities::users::UserEntity, repositories::users::MockUserRepository};
    use mockall::predicate::eq;

    fn user(id: Uuid, email: &str) -> UserEntity {
        UserEntity {
            id,
            name: "Jane".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn get_unknown_user_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let usecase = UserUseCase::new(Arc::new(repo));
        let err = usecase.get(Uuid::new_v4()).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_hides_password_hashes() {
        let mut repo = MockUserRepository::new();
        repo.expect_list()
            .returning(|| Ok(vec![user(Uuid::new_v4(), "jane@example.com")]));

        let usecase = UserUseCase::new(Arc::new(repo));
        let users = usecase.list().await.unwrap();

        let json = serde_json::to_value(&users).unwrap();
        assert!(json[0].get("passwordHash").is_none());
        assert_eq!(json[0]["email"], "jane@example.com");
    }

    #[tokio::test]
    async fn update_of_another_account_is_forbidden() {
        let mut repo = MockUserRepository::new();
        repo.expect_update().never();

        let usecase = UserUseCase::new(Arc::new(repo));
        let err = usecase
            .update(Uuid::new_v4(), Uuid::new_v4(), UpdateUserModel::default(), Utc::now())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "You can only update your own account");
    }

    #[tokio::test]
    async fn update_to_taken_email_conflicts() {
        let user_id = Uuid::new_v4();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .with(eq(user_id))
            .returning(move |id| Ok(Some(user(id, "jane@example.com"))));
        repo.expect_find_by_email()
            .with(eq("taken@example.com".to_string()))
            .returning(|email| Ok(Some(user(Uuid::new_v4(), &email))));
        repo.expect_update().never();

        let patch = UpdateUserModel {
            email: Some("Taken@Example.com".to_string()),
            ..Default::default()
        };

        let usecase = UserUseCase::new(Arc::new(repo));
        let err = usecase.update(user_id, user_id, patch, Utc::now()).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn update_losing_unique_email_race_conflicts() {
        let user_id = Uuid::new_v4();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(move |id| Ok(Some(user(id, "jane@example.com"))));
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_update().times(1).returning(|_, _| {
            Err(RepositoryError::UniqueViolation("users_email_key".to_string()).into())
        });

        let patch = UpdateUserModel {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };

        let usecase = UserUseCase::new(Arc::new(repo));
        let err = usecase.update(user_id, user_id, patch, Utc::now()).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn update_keeping_own_email_succeeds() {
        let user_id = Uuid::new_v4();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(move |id| Ok(Some(user(id, "jane@example.com"))));
        repo.expect_find_by_email()
            .returning(move |email| Ok(Some(user(user_id, &email))));
        repo.expect_update()
            .withf(|_, update| {
                update.name.as_deref() == Some("Janet")
                    && update.email.as_deref() == Some("jane@example.com")
                    && update.password_hash.is_none()
            })
            .times(1)
            .returning(|id, update| {
                let mut stored = user(id, "jane@example.com");
                stored.name = update.name.unwrap_or(stored.name);
                Ok(stored)
            });

        let patch = UpdateUserModel {
            name: Some(" Janet ".to_string()),
            email: Some("jane@example.com".to_string()),
            password: None,
        };

        let usecase = UserUseCase::new(Arc::new(repo));
        let updated = usecase.update(user_id, user_id, patch, Utc::now()).await.unwrap();

        assert_eq!(updated.name, "Janet");
    }

    #[tokio::test]
    async fn update_rehashes_new_password() {
        let user_id = Uuid::new_v4();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(move |id| Ok(Some(user(id, "jane@example.com"))));
        repo.expect_update()
            .withf(|_, update| {
                update
                    .password_hash
                    .as_deref()
                    .is_some_and(|hash| password::verify_password("new-secret", hash).unwrap_or(false))
            })
            .times(1)
            .returning(|id, _| Ok(user(id, "jane@example.com")));

        let patch = UpdateUserModel {
            password: Some("new-secret".to_string()),
            ..Default::default()
        };

        let usecase = UserUseCase::new(Arc::new(repo));
        usecase.update(user_id, user_id, patch, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn delete_own_account() {
        let user_id = Uuid::new_v4();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(move |id| Ok(Some(user(id, "jane@example.com"))));
        repo.expect_delete()
            .with(eq(user_id))
            .times(1)
            .returning(|_| Ok(()));

        let usecase = UserUseCase::new(Arc::new(repo));
        usecase.delete(user_id, user_id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_of_another_account_is_forbidden() {
        let mut repo = MockUserRepository::new();
        repo.expect_delete().never();

        let usecase = UserUseCase::new(Arc::new(repo));
        let err = usecase.delete(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, UserError::Forbidden("delete")));
    }
}
