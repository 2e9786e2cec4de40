use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("reactivation required: press /start")]
    ReactivationRequired,
    #[error("unknown plan: {0}")]
    UnknownPlan(String),
    #[error("credit amount must be between 1 and 100, got {0}")]
    InvalidCreditAmount(i32),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown access attempt: {0}")]
    UnknownAttempt(uuid::Uuid),
    #[error("quota refunds are disabled")]
    RefundDisabled,
    #[error("a batch job is already running")]
    BatchJobAlreadyRunning,
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook body")]
    MalformedBody,
    #[error("payment provider unavailable")]
    ProviderUnavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EntitlementError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntitlementError::ReactivationRequired => StatusCode::PRECONDITION_REQUIRED,
            EntitlementError::UnknownPlan(_)
            | EntitlementError::InvalidCreditAmount(_)
            | EntitlementError::InvalidInput(_)
            | EntitlementError::MalformedBody => StatusCode::BAD_REQUEST,
            EntitlementError::UnknownAttempt(_) => StatusCode::NOT_FOUND,
            EntitlementError::RefundDisabled | EntitlementError::BatchJobAlreadyRunning => {
                StatusCode::CONFLICT
            }
            EntitlementError::InvalidSignature => StatusCode::UNAUTHORIZED,
            EntitlementError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            EntitlementError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, EntitlementError>;
