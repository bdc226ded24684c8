use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tally::auth::token_matches;
use tracing::{debug, warn};

use crate::{
    error::AppError,
    state::AppState,
    utils::client_identity,
};

fn identify(state: &AppState, request: &Request) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| *address);

    client_identity(request.headers(), peer, &state.config.real_ip_header)
}

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = identify(&state, &request);
    let quota = state.limiter.check(&client)?;

    let mut response = next.run(request).await;
    quota.apply(response.headers_mut());

    Ok(response)
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| token_matches(provided, &state.config.admin_token));

    let client = identify(&state, &request);
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    if !authorized {
        warn!(client, path, %method, "Authentication failed");
        return Err(AppError::Unauthorized);
    }

    debug!(client, path, %method, "Authentication successful");

    Ok(next.run(request).await)
}
