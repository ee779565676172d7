use std::sync::Arc;

use anyhow::anyhow;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{
    entities::subscriptions::SubscriptionEntity,
    errors::{RepositoryError, ValidationError},
    lifecycle,
    repositories::subscriptions::SubscriptionRepository,
    spending::{self, SpendingSummary},
    value_objects::{
        enums::subscription_statuses::SubscriptionStatus,
        subscriptions::{
            InsertSubscriptionModel, SubscriptionModel, SubscriptionRecord,
            UpdateSubscriptionModel,
        },
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Subscription not found")]
    NotFound,
    #[error("Account no longer exists")]
    OwnerMissing,
    #[error("You are not authorized to {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::NotFound => StatusCode::NOT_FOUND,
            SubscriptionError::OwnerMissing => StatusCode::UNAUTHORIZED,
            SubscriptionError::Forbidden(_) => StatusCode::FORBIDDEN,
            SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::NotFound => AppError::NotFound(err.to_string()),
            SubscriptionError::OwnerMissing => AppError::Unauthorized(err.to_string()),
            SubscriptionError::Forbidden(_) => AppError::Forbidden(err.to_string()),
            SubscriptionError::Validation(_) => AppError::BadRequest(err.to_string()),
            SubscriptionError::Internal(inner) => AppError::Internal(inner),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

pub struct SubscriptionUseCase<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repository: Arc<S>,
}

impl<S> SubscriptionUseCase<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repository: Arc<S>) -> Self {
        Self {
            subscription_repository,
        }
    }

    pub async fn list_own(&self, user_id: Uuid) -> UseCaseResult<Vec<SubscriptionModel>> {
        let entities = self
            .subscription_repository
            .list_by_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to list subscriptions");
                SubscriptionError::Internal(err)
            })?;

        to_models(entities)
    }

    pub async fn list_for_user(
        &self,
        caller_id: Uuid,
        user_id: Uuid,
    ) -> UseCaseResult<Vec<SubscriptionModel>> {
        if caller_id != user_id {
            warn!(%caller_id, %user_id, "subscriptions: listing another user's subscriptions denied");
            return Err(SubscriptionError::Forbidden("view this user's subscriptions"));
        }

        self.list_own(user_id).await
    }

    pub async fn get(
        &self,
        caller_id: Uuid,
        subscription_id: Uuid,
    ) -> UseCaseResult<SubscriptionModel> {
        self.load_owned(caller_id, subscription_id, "view this subscription")
            .await
    }

    pub async fn create(
        &self,
        caller_id: Uuid,
        insert_subscription_model: InsertSubscriptionModel,
        now: DateTime<Utc>,
    ) -> UseCaseResult<SubscriptionModel> {
        let draft = insert_subscription_model.to_draft().map_err(|err| {
            warn!(%caller_id, error = %err, "subscriptions: invalid create request");
            err
        })?;

        let record = lifecycle::finalize(draft, now).map_err(|err| {
            warn!(%caller_id, error = %err, "subscriptions: subscription rejected by lifecycle");
            err
        })?;
        debug!(
            %caller_id,
            interval = %record.interval,
            renewal_date = %record.renewal_date,
            status = %record.status,
            "subscriptions: finalized new subscription"
        );

        let entity = self
            .subscription_repository
            .create(record.to_insert_entity(caller_id, now))
            .await
            .map_err(|err| match RepositoryError::find(&err) {
                Some(RepositoryError::ForeignKeyViolation(_)) => {
                    warn!(%caller_id, "subscriptions: session outlived its account");
                    SubscriptionError::OwnerMissing
                }
                _ => {
                    error!(%caller_id, db_error = ?err, "subscriptions: failed to create subscription");
                    SubscriptionError::Internal(err)
                }
            })?;

        info!(%caller_id, subscription_id = %entity.id, "subscriptions: subscription created");
        to_model(entity)
    }

    pub async fn update(
        &self,
        caller_id: Uuid,
        subscription_id: Uuid,
        update_subscription_model: UpdateSubscriptionModel,
        now: DateTime<Utc>,
    ) -> UseCaseResult<SubscriptionModel> {
        let current = self
            .load_owned(caller_id, subscription_id, "update this subscription")
            .await?;

        let draft = update_subscription_model.apply_to(current.record)?;
        let record = lifecycle::finalize(draft, now)?;
        debug!(
            %caller_id,
            %subscription_id,
            reschedule = update_subscription_model.touches_schedule(),
            renewal_date = %record.renewal_date,
            status = %record.status,
            "subscriptions: finalized subscription update"
        );

        self.save(subscription_id, &record, now).await
    }

    pub async fn delete(&self, caller_id: Uuid, subscription_id: Uuid) -> UseCaseResult<()> {
        self.load_owned(caller_id, subscription_id, "delete this subscription")
            .await?;

        self.subscription_repository
            .delete(subscription_id)
            .await
            .map_err(|err| {
                error!(%caller_id, %subscription_id, db_error = ?err, "subscriptions: failed to delete subscription");
                SubscriptionError::Internal(err)
            })?;

        info!(%caller_id, %subscription_id, "subscriptions: subscription deleted");
        Ok(())
    }

    /// Marks the subscription canceled. A renewal date already in the past
    /// still wins, so the stored status becomes `expired`.
    pub async fn cancel(
        &self,
        caller_id: Uuid,
        subscription_id: Uuid,
        now: DateTime<Utc>,
    ) -> UseCaseResult<SubscriptionModel> {
        let current = self
            .load_owned(caller_id, subscription_id, "cancel this subscription")
            .await?;

        let mut record = current.record;
        record.status = SubscriptionStatus::Canceled;
        let record = lifecycle::finalize(record.into(), now)?;

        let saved = self.save(subscription_id, &record, now).await?;
        info!(%caller_id, %subscription_id, status = %saved.record.status, "subscriptions: subscription canceled");
        Ok(saved)
    }

    pub async fn upcoming_renewals(
        &self,
        caller_id: Uuid,
        now: DateTime<Utc>,
    ) -> UseCaseResult<Vec<SubscriptionModel>> {
        let entities = self
            .subscription_repository
            .list_by_user_and_status(caller_id, SubscriptionStatus::Active)
            .await
            .map_err(|err| {
                error!(%caller_id, db_error = ?err, "subscriptions: failed to list active subscriptions");
                SubscriptionError::Internal(err)
            })?;

        let upcoming = lifecycle::filter_upcoming(to_models(entities)?, now);
        debug!(%caller_id, count = upcoming.len(), "subscriptions: upcoming renewals resolved");
        Ok(upcoming)
    }

    pub async fn spending_summary(
        &self,
        caller_id: Uuid,
        now: DateTime<Utc>,
    ) -> UseCaseResult<SpendingSummary> {
        let subscriptions = self.list_own(caller_id).await?;
        Ok(spending::summarize(&subscriptions, now))
    }

    async fn load_owned(
        &self,
        caller_id: Uuid,
        subscription_id: Uuid,
        action: &'static str,
    ) -> UseCaseResult<SubscriptionModel> {
        let entity = self
            .subscription_repository
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(%caller_id, %subscription_id, db_error = ?err, "subscriptions: failed to load subscription");
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%caller_id, %subscription_id, "subscriptions: subscription not found");
                SubscriptionError::NotFound
            })?;

        if entity.user_id != caller_id {
            warn!(
                %caller_id,
                %subscription_id,
                owner_id = %entity.user_id,
                status = StatusCode::FORBIDDEN.as_u16(),
                "subscriptions: caller does not own subscription"
            );
            return Err(SubscriptionError::Forbidden(action));
        }

        to_model(entity)
    }

    async fn save(
        &self,
        subscription_id: Uuid,
        record: &SubscriptionRecord,
        now: DateTime<Utc>,
    ) -> UseCaseResult<SubscriptionModel> {
        let entity = self
            .subscription_repository
            .update(subscription_id, record.to_update_entity(now))
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "subscriptions: failed to update subscription");
                SubscriptionError::Internal(err)
            })?;

        to_model(entity)
    }
}

fn to_model(entity: SubscriptionEntity) -> UseCaseResult<SubscriptionModel> {
    let subscription_id = entity.id;
    SubscriptionModel::try_from(entity).map_err(|err| {
        error!(%subscription_id, error = %err, "subscriptions: stored row is not a valid subscription");
        SubscriptionError::Internal(anyhow!("corrupt subscription {}: {}", subscription_id, err))
    })
}

fn to_models(entities: Vec<SubscriptionEntity>) -> UseCaseResult<Vec<SubscriptionModel>> {
    entities.into_iter().map(to_model).collect()
}
