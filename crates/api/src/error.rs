//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use fulfillment::FulfillmentError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Account or catalog error.
    Domain(DomainError),
    /// Order placement or history error.
    Fulfillment(FulfillmentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::InvalidCredentials | DomainError::Unauthenticated => {
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        DomainError::Forbidden { .. } => (StatusCode::FORBIDDEN, err.to_string()),
        DomainError::UserNotFound(_) | DomainError::ProductNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        DomainError::EmailTaken => (StatusCode::CONFLICT, err.to_string()),
        DomainError::PasswordHash(_) => {
            tracing::error!(error = %err, "password hashing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        }
        DomainError::Store(store_err) => store_error_to_response(store_err, err.to_string()),
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::EmptyOrder | FulfillmentError::InvalidQuantity { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        FulfillmentError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        FulfillmentError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        FulfillmentError::FulfillmentFailed { .. } | FulfillmentError::CompensationFailed { .. } => {
            tracing::error!(error = %err, "order left inventory needing reconciliation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Order could not be completed".to_string(),
            )
        }
        FulfillmentError::Store(store_err) => store_error_to_response(store_err, err.to_string()),
    }
}

fn store_error_to_response(err: &StoreError, message: String) -> (StatusCode, String) {
    match err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, message),
        StoreError::Conflict(_) => (StatusCode::CONFLICT, message),
        _ => {
            tracing::error!(error = %message, "store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}
