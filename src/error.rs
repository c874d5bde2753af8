//! Error types shared by every operation and their HTTP rendering.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

use crate::settlement::SettlementError;
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Access denied. No token provided.")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Expense not found")]
    NotFound,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("Storage failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Failed to generate report: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: &'static str,
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingToken => "no_token",
            AppError::InvalidToken => "invalid_token",
            AppError::NotFound => "not_found",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Settlement(SettlementError::AlreadyInState) => "already_in_state",
            AppError::Settlement(SettlementError::IndexOutOfRange { .. }) => {
                "invalid_detail_index"
            }
            AppError::Persistence(_) => "persistence_error",
            AppError::Export(_) => "export_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken | AppError::InvalidRequest(_) | AppError::Settlement(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Persistence(_) | AppError::Export(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(status).json(ErrorResponse {
            error: self.to_string(),
            error_code: self.error_code(),
        })
    }
}
