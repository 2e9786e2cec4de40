use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use tracing::info;

use crate::{
    application::usecases::cryptopay_webhook::CryptoPayWebhookUseCase,
    infrastructure::axum_http::error_responses::AppError,
};

pub const SIGNATURE_HEADER: &str = "crypto-pay-api-signature";

pub fn routes(usecase: Arc<CryptoPayWebhookUseCase>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .with_state(usecase)
}

pub async fn webhook(
    State(usecase): State<Arc<CryptoPayWebhookUseCase>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let ack = usecase.handle(&body, signature).await?;
    info!(ack = ?ack, "cryptopay_webhook: acknowledged");

    Ok(Json(json!({ "ok": true })))
}
