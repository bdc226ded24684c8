use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tally::auth::token_matches;
use tracing::warn;

use crate::{error::DalError, state::DalState};

pub async fn require_token(
    State(state): State<Arc<DalState>>,
    request: Request,
    next: Next,
) -> Result<Response, DalError> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| token_matches(provided, &state.access_token));

    if !authorized {
        warn!(path = request.uri().path(), "Rejected request with invalid token");
        return Err(DalError::Unauthorized);
    }

    Ok(next.run(request).await)
}
