use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Request to data layer failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Data layer answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Malformed data layer response: {0}")]
    Decode(String),

    #[error("Backend error: {0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Backend(message.into())
    }
}
