use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tally::{StoreError, models::Envelope};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum DalError {
    #[error("Invalid authorization header")]
    Unauthorized,

    #[error("Invalid body")]
    InvalidBody,

    #[error("Config not found")]
    NotFound,

    #[error("Storage unavailable")]
    Store(#[from] StoreError),
}

impl IntoResponse for DalError {
    fn into_response(self) -> Response {
        let status = match &self {
            DalError::Unauthorized => StatusCode::FORBIDDEN,
            DalError::InvalidBody => StatusCode::BAD_REQUEST,
            DalError::NotFound => StatusCode::NOT_FOUND,
            DalError::Store(e) => {
                error!(error = %e, "Storage request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(Envelope::<()>::failure(self.to_string()))).into_response()
    }
}
