use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::IntoResponse,
    routing::{get, patch},
};
use chrono::Utc;
use domain::{
    repositories::subscriptions::SubscriptionRepository,
    value_objects::subscriptions::{InsertSubscriptionModel, UpdateSubscriptionModel},
};
use infra::postgres::{
    postgres_connection::PgPoolSquad, repositories::subscriptions::SubscriptionPostgres,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::{error_responses::AppError, responses::ApiResponse},
    usecases::subscriptions::SubscriptionUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let subscription_usecase = SubscriptionUseCase::new(Arc::new(subscription_repository));

    Router::new()
        .route("/", get(list_own).post(create))
        .route("/upcoming-renewals", get(upcoming_renewals))
        .route("/stats", get(spending_summary))
        .route("/user/:id", get(list_for_user))
        .route("/:id", get(get_subscription).put(update).delete(remove))
        .route("/:id/cancel", patch(cancel))
        .with_state(Arc::new(subscription_usecase))
}

pub async fn list_own<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let subscriptions = subscription_usecase.list_own(auth.user_id).await?;
    Ok(ApiResponse::ok(subscriptions))
}

pub async fn list_for_user<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let Path(user_id) = user_id?;
    let subscriptions = subscription_usecase
        .list_for_user(auth.user_id, user_id)
        .await?;
    Ok(ApiResponse::ok(subscriptions))
}

pub async fn get_subscription<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
    subscription_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let Path(subscription_id) = subscription_id?;
    let subscription = subscription_usecase
        .get(auth.user_id, subscription_id)
        .await?;
    Ok(ApiResponse::ok(subscription))
}

pub async fn create<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
    payload: Result<Json<InsertSubscriptionModel>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let Json(insert_subscription_model) = payload?;
    let subscription = subscription_usecase
        .create(auth.user_id, insert_subscription_model, Utc::now())
        .await?;
    Ok(ApiResponse::created(subscription).with_message("Subscription created successfully"))
}

pub async fn update<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
    subscription_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateSubscriptionModel>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let Path(subscription_id) = subscription_id?;
    let Json(update_subscription_model) = payload?;

    let subscription = subscription_usecase
        .update(
            auth.user_id,
            subscription_id,
            update_subscription_model,
            Utc::now(),
        )
        .await?;
    Ok(ApiResponse::ok(subscription).with_message("Subscription updated successfully"))
}

pub async fn remove<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
    subscription_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let Path(subscription_id) = subscription_id?;
    subscription_usecase
        .delete(auth.user_id, subscription_id)
        .await?;
    Ok(ApiResponse::message("Subscription deleted successfully"))
}

pub async fn cancel<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
    subscription_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let Path(subscription_id) = subscription_id?;
    let subscription = subscription_usecase
        .cancel(auth.user_id, subscription_id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(subscription).with_message("Subscription canceled successfully"))
}

pub async fn upcoming_renewals<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let subscriptions = subscription_usecase
        .upcoming_renewals(auth.user_id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(subscriptions))
}

pub async fn spending_summary<T>(
    State(subscription_usecase): State<Arc<SubscriptionUseCase<T>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    T: SubscriptionRepository + Send + Sync + 'static,
{
    let summary = subscription_usecase
        .spending_summary(auth.user_id, Utc::now())
        .await?;
    Ok(ApiResponse::ok(summary))
}
