use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Caller-visible failures. Upstream AI failures are deliberately absent:
/// the extractor and responder recover locally (fallback strings, explicit
/// `success: false` outcomes) instead of surfacing here.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Access denied")]
    AccessDenied,

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::NotFound(_) | ApiError::Validation(_) | ApiError::Conflict(_) => {
                debug!("client error: {}", self)
            }
            ApiError::AccessDenied | ApiError::Unauthorized => warn!("auth error: {}", self),
            ApiError::Internal(e) => error!("server error: {:?}", e),
        }

        HttpResponse::build(self.status()).json(json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}
