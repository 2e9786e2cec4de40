use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::error_responses::AppError;

/// Bearer token shared with the chat front-end.
#[derive(Clone)]
pub struct InternalToken(pub Arc<String>);

pub async fn require_internal_token(
    State(token): State<InternalToken>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if !authorize_bearer(&headers, &token.0) {
        warn!(path = %request.uri().path(), "internal_auth: rejected request");
        return AppError::Unauthorized.into_response();
    }
    next.run(request).await
}

pub fn authorize_bearer(headers: &HeaderMap, expected_token: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some_and(|token| !expected_token.is_empty() && token == expected_token)
}
