use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use domain::{repositories::users::UserRepository, value_objects::users::UpdateUserModel};
use infra::postgres::{postgres_connection::PgPoolSquad, repositories::users::UserPostgres};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::{error_responses::AppError, responses::ApiResponse},
    usecases::users::UserUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let user_usecase = UserUseCase::new(Arc::new(user_repository));

    Router::new()
        .route("/", get(list))
        .route("/:id", get(get_user).put(update).delete(remove))
        .with_state(Arc::new(user_usecase))
}

pub async fn list<T>(
    State(user_usecase): State<Arc<UserUseCase<T>>>,
    _auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    T: UserRepository + Send + Sync + 'static,
{
    let users = user_usecase.list().await?;
    Ok(ApiResponse::ok(users))
}

pub async fn get_user<T>(
    State(user_usecase): State<Arc<UserUseCase<T>>>,
    _auth: AuthUser,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: UserRepository + Send + Sync + 'static,
{
    let Path(user_id) = user_id?;
    let user = user_usecase.get(user_id).await?;
    Ok(ApiResponse::ok(user))
}

pub async fn update<T>(
    State(user_usecase): State<Arc<UserUseCase<T>>>,
    auth: AuthUser,
    user_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserModel>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: UserRepository + Send + Sync + 'static,
{
    let Path(user_id) = user_id?;
    let Json(update_user_model) = payload?;

    let user = user_usecase
        .update(auth.user_id, user_id, update_user_model, Utc::now())
        .await?;
    Ok(ApiResponse::ok(user).with_message("User updated successfully"))
}

pub async fn remove<T>(
    State(user_usecase): State<Arc<UserUseCase<T>>>,
    auth: AuthUser,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: UserRepository + Send + Sync + 'static,
{
    let Path(user_id) = user_id?;
    user_usecase.delete(auth.user_id, user_id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}
