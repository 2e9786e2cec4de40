use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    application::usecases::{
        access_decision::AccessDecisionUseCase, checkout::CheckoutUseCase,
        user_sessions::UserSessionUseCase,
    },
    domain::value_objects::attempts::AttemptOutcome,
    infrastructure::axum_http::error_responses::AppError,
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT/api/v1/users/42/access" \
//     -H "Authorization: Bearer $INTERNAL_API_TOKEN" \
//     -H "Content-Type: application/json" \
//     -d '{"query":"+380 63 665 92 55"}'

#[derive(Clone)]
pub struct UserRouteState {
    pub sessions: Arc<UserSessionUseCase>,
    pub access: Arc<AccessDecisionUseCase>,
    pub checkout: Arc<CheckoutUseCase>,
}

pub fn routes(state: UserRouteState) -> Router {
    Router::new()
        .route("/:id/start", post(start))
        .route("/:id/status", get(status))
        .route("/:id/access", post(access))
        .route("/:id/access/refund", post(refund))
        .route("/:id/access/:attempt_id/finish", post(finish))
        .route("/:id/checkout", post(checkout))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AccessRequestBody {
    pub query: String,
    #[serde(default)]
    pub privileged: bool,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequestBody {
    pub attempt_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FinishResponse {
    pub recorded: bool,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub refunded: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequestBody {
    pub plan: String,
}

pub async fn start(
    State(state): State<UserRouteState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.sessions.start(user_id, Utc::now()).await?;
    Ok(Json(status))
}

pub async fn status(
    State(state): State<UserRouteState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.sessions.status(user_id, Utc::now()).await?;
    Ok(Json(status))
}

pub async fn access(
    State(state): State<UserRouteState>,
    Path(user_id): Path<i64>,
    Json(body): Json<AccessRequestBody>,
) -> Result<impl IntoResponse, AppError> {
    let decision = state
        .access
        .decide(user_id, body.privileged, &body.query, Utc::now())
        .await?;
    Ok(Json(decision))
}

pub async fn refund(
    State(state): State<UserRouteState>,
    Path(user_id): Path<i64>,
    Json(body): Json<RefundRequestBody>,
) -> Result<impl IntoResponse, AppError> {
    let refunded = state
        .access
        .refund(user_id, body.attempt_id, Utc::now())
        .await?;
    Ok(Json(RefundResponse { refunded }))
}

pub async fn finish(
    State(state): State<UserRouteState>,
    Path((user_id, attempt_id)): Path<(i64, Uuid)>,
    Json(outcome): Json<AttemptOutcome>,
) -> Result<impl IntoResponse, AppError> {
    let recorded = state
        .access
        .finish(user_id, attempt_id, outcome, Utc::now())
        .await?;
    Ok(Json(FinishResponse { recorded }))
}

pub async fn checkout(
    State(state): State<UserRouteState>,
    Path(user_id): Path<i64>,
    Json(body): Json<CheckoutRequestBody>,
) -> Result<impl IntoResponse, AppError> {
    let checkout = state
        .checkout
        .create_checkout(user_id, &body.plan, Utc::now())
        .await?;
    Ok(Json(checkout))
}
