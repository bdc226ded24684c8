use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally::StoreError;
use thiserror::Error;
use tracing::error;

use crate::rate_limit::{RATELIMIT_LIMIT, RATELIMIT_REMAINING, RATELIMIT_RESET};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Invalid Key or Value")]
    InvalidConfig,

    #[error("Invalid Amount")]
    InvalidAmount,

    #[error("Auth Failed")]
    Unauthorized,

    #[error("Config not found")]
    ConfigNotFound,

    #[error("Too many clicks, slow down")]
    RateLimited { limit: u32, retry_after: u64 },

    #[error("Counter limit reached")]
    CounterFull,

    #[error("Data layer unavailable")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload | AppError::InvalidConfig | AppError::InvalidAmount => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::ConfigNotFound => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::CounterFull | AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Store(e) = &self {
            error!(error = %e, "Data layer request failed");
        }

        let status = self.status_code();
        let body = Json(json!({ "success": false, "error": self.to_string() }));
        let mut response = (status, body).into_response();

        if let AppError::RateLimited { limit, retry_after } = self {
            let headers = response.headers_mut();
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
            headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(RATELIMIT_REMAINING, HeaderValue::from(0u32));
            headers.insert(RATELIMIT_RESET, HeaderValue::from(retry_after));
        }

        response
    }
}
