use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ApiMessage;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// Failure answered as `{success: false, message}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub message: String,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Missing or invalid API key")
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiMessage::failure(self.message))).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => JsonApiError::new(StatusCode::BAD_REQUEST, msg),
            ServiceError::MissingId => JsonApiError::new(StatusCode::BAD_REQUEST, e.to_string()),
            ServiceError::NotFound(msg) => JsonApiError::new(StatusCode::NOT_FOUND, msg),
            // storage details stay in the logs
            ServiceError::Retrieval(detail) => {
                error!(%detail, "retrieval failure");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Retrieval failure.")
            }
            ServiceError::Persistence(detail) => {
                error!(%detail, "persistence failure");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal persistence failure.")
            }
            ServiceError::StoreUnavailable(detail) => {
                error!(%detail, "store unavailable");
                JsonApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Store unavailable.")
            }
        }
    }
}

impl From<JsonRejection> for JsonApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        JsonApiError::new(rejection.status(), rejection.body_text())
    }
}

/// Fallback for known paths hit with a verb they do not serve.
pub async fn method_not_allowed() -> JsonApiError {
    JsonApiError::method_not_allowed()
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
