use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    application::usecases::{
        admin::{AdminUseCase, TrialAction},
        batch_jobs::BatchJobRunner,
        reconcile_sweeper::ReconcileSweeperUseCase,
    },
    domain::value_objects::batch_jobs::BatchMutation,
    infrastructure::axum_http::error_responses::AppError,
};

#[derive(Clone)]
pub struct AdminRouteState {
    pub admin: Arc<AdminUseCase>,
    pub batch_runner: Arc<BatchJobRunner>,
    pub sweeper: Arc<ReconcileSweeperUseCase>,
    pub trial_limit: i32,
}

pub fn routes(state: AdminRouteState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/block", post(set_blocked))
        .route("/users/:id/hide", post(set_hidden))
        .route("/users/:id/credits", post(grant_credits))
        .route("/users/:id/trial", post(reset_trial))
        .route("/users/:id/subscription", post(grant_subscription))
        .route("/history", get(history))
        .route("/denylist", post(add_denylist).delete(remove_denylist))
        .route("/batch/expire-trials", post(start_expire_trials))
        .route("/batch/current", get(current_batch))
        .route("/reconcile", post(reconcile))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FlagBody {
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreditsBody {
    pub amount: i32,
}

#[derive(Debug, Deserialize)]
pub struct TrialBody {
    pub action: TrialAction,
}

#[derive(Debug, Deserialize)]
pub struct PlanBody {
    pub plan: String,
}

#[derive(Debug, Deserialize)]
pub struct DenylistBody {
    #[serde(default)]
    pub values: Vec<String>,
    pub raw: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchStartBody {
    pub progress_handle: Option<String>,
}

pub async fn list_users(
    State(state): State<AdminRouteState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.admin.list_users(query.page.unwrap_or(0)).await?;
    Ok(Json(page))
}

pub async fn history(
    State(state): State<AdminRouteState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.admin.history(query.page.unwrap_or(0)).await?;
    Ok(Json(page))
}

pub async fn set_blocked(
    State(state): State<AdminRouteState>,
    Path(user_id): Path<i64>,
    Json(body): Json<FlagBody>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.admin.set_blocked(user_id, body.value, Utc::now()).await?;
    Ok(Json(user))
}

pub async fn set_hidden(
    State(state): State<AdminRouteState>,
    Path(user_id): Path<i64>,
    Json(body): Json<FlagBody>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.admin.set_hidden(user_id, body.value, Utc::now()).await?;
    Ok(Json(user))
}

pub async fn grant_credits(
    State(state): State<AdminRouteState>,
    Path(user_id): Path<i64>,
    Json(body): Json<CreditsBody>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .admin
        .grant_credits(user_id, body.amount, Utc::now())
        .await?;
    Ok(Json(user))
}

pub async fn reset_trial(
    State(state): State<AdminRouteState>,
    Path(user_id): Path<i64>,
    Json(body): Json<TrialBody>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .admin
        .reset_trial(user_id, body.action, Utc::now())
        .await?;
    Ok(Json(user))
}

pub async fn grant_subscription(
    State(state): State<AdminRouteState>,
    Path(user_id): Path<i64>,
    Json(body): Json<PlanBody>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .admin
        .grant_subscription(user_id, &body.plan, Utc::now())
        .await?;
    Ok(Json(user))
}

pub async fn add_denylist(
    State(state): State<AdminRouteState>,
    Json(body): Json<DenylistBody>,
) -> Result<impl IntoResponse, AppError> {
    let change = state
        .admin
        .add_denylist(body.values, body.raw.as_deref())
        .await?;
    Ok(Json(change))
}

pub async fn remove_denylist(
    State(state): State<AdminRouteState>,
    Json(body): Json<DenylistBody>,
) -> Result<impl IntoResponse, AppError> {
    let change = state
        .admin
        .remove_denylist(body.values, body.raw.as_deref())
        .await?;
    Ok(Json(change))
}

pub async fn start_expire_trials(
    State(state): State<AdminRouteState>,
    body: Option<Json<BatchStartBody>>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.unwrap_or_default();
    let mutation = BatchMutation::ExpireTrials {
        trial_limit: state.trial_limit,
    };

    state.batch_runner.start(mutation, body.progress_handle)?;
    info!(job = %mutation, "admin: batch job started");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job": mutation.as_str(), "state": "running" })),
    ))
}

pub async fn current_batch(State(state): State<AdminRouteState>) -> impl IntoResponse {
    Json(state.batch_runner.current())
}

pub async fn reconcile(State(state): State<AdminRouteState>) -> Result<impl IntoResponse, AppError> {
    let report = state.sweeper.sweep(Utc::now()).await?;
    Ok(Json(report))
}
