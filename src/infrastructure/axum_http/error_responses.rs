use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::application::usecases::entitlement_errors::EntitlementError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Entitlement(#[from] EntitlementError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Entitlement(err) => {
                let status = err.status_code();
                let message = match &err {
                    // Don't leak internal error detail to client
                    EntitlementError::Internal(source) => {
                        error!(error = ?source, "http: request failed");
                        "Internal server error".to_string()
                    }
                    EntitlementError::ProviderUnavailable(source) => {
                        error!(error = ?source, "http: payment provider failed");
                        "Payment provider unavailable, try again later".to_string()
                    }
                    other => other.to_string(),
                };
                (status, message)
            }
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}
