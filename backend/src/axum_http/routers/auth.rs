use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use domain::{
    repositories::users::UserRepository,
    value_objects::users::{SignInModel, SignUpModel},
};
use infra::postgres::{postgres_connection::PgPoolSquad, repositories::users::UserPostgres};

use crate::{
    auth::{self, TokenService},
    axum_http::{error_responses::AppError, responses::ApiResponse},
    usecases::accounts::AccountUseCase,
};

pub struct AuthRouterState<T>
where
    T: UserRepository + Send + Sync + 'static,
{
    account_usecase: AccountUseCase<T>,
    cookie_secure: bool,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    token_service: Arc<TokenService>,
    cookie_secure: bool,
) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let account_usecase = AccountUseCase::new(Arc::new(user_repository), token_service);

    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/sign-out", post(sign_out))
        .with_state(Arc::new(AuthRouterState {
            account_usecase,
            cookie_secure,
        }))
}

pub async fn sign_up<T>(
    State(state): State<Arc<AuthRouterState<T>>>,
    jar: CookieJar,
    payload: Result<Json<SignUpModel>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: UserRepository + Send + Sync + 'static,
{
    let Json(sign_up_model) = payload?;
    let session = state.account_usecase.sign_up(sign_up_model, Utc::now()).await?;

    let cookie = auth::session_cookie(
        session.token.clone(),
        state.account_usecase.session_ttl_seconds(),
        state.cookie_secure,
    );

    Ok((
        jar.add(cookie),
        ApiResponse::created(session).with_message("User created successfully"),
    ))
}

pub async fn sign_in<T>(
    State(state): State<Arc<AuthRouterState<T>>>,
    jar: CookieJar,
    payload: Result<Json<SignInModel>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: UserRepository + Send + Sync + 'static,
{
    let Json(sign_in_model) = payload?;
    let session = state.account_usecase.sign_in(sign_in_model, Utc::now()).await?;

    let cookie = auth::session_cookie(
        session.token.clone(),
        state.account_usecase.session_ttl_seconds(),
        state.cookie_secure,
    );

    Ok((
        jar.add(cookie),
        ApiResponse::ok(session).with_message("User signed in successfully"),
    ))
}

pub async fn sign_out(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(auth::cleared_session_cookie()),
        ApiResponse::message("User signed out successfully"),
    )
}
