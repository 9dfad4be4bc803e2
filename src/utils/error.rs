use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::documents::RenderError;
use crate::payments::PaymentError;
use crate::store::{PurchaseError, StoreError};
use crate::utils::response::error as error_response;

/// Boundary error for every handler. Domain rejections keep their message;
/// collaborator failures are logged and surfaced opaquely.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Data store error: {0}")]
    StoreFailure(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Document rendering error: {0}")]
    RenderFailure(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreFailure(_)
            | AppError::ExternalServiceError(_)
            | AppError::RenderFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::StoreFailure(_) => "STORE_ERROR",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::RenderFailure(_) => "RENDER_ERROR",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => AppError::Conflict(message),
            StoreError::Backend(message) => AppError::StoreFailure(message),
        }
    }
}

impl From<PurchaseError> for AppError {
    fn from(err: PurchaseError) -> Self {
        match err {
            PurchaseError::EventNotFound => AppError::NotFound("Event not found".to_string()),
            PurchaseError::EventInactive => {
                AppError::ValidationError("Event is not active".to_string())
            }
            PurchaseError::SoldOut => AppError::ValidationError("Event is sold out".to_string()),
            PurchaseError::SalesClosed => {
                AppError::ValidationError("Ticket sales have ended".to_string())
            }
            PurchaseError::Store(err) => err.into(),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        AppError::ExternalServiceError(err.to_string())
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::RenderFailure(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Internal details go to the log, not the client.
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::StoreFailure(msg) => {
                error!(error = %msg, "data store failure");
                "A data store error occurred".to_string()
            }
            AppError::ExternalServiceError(msg) => {
                error!(error = %msg, "external service failure");
                "An external service error occurred".to_string()
            }
            AppError::RenderFailure(msg) => {
                error!(error = %msg, "document rendering failure");
                "Failed to render the document".to_string()
            }
        };

        error_response(code, public_message, None, status)
    }
}
