use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tally::CounterSnapshot;
use tracing::{info, warn};

use crate::{
    achievement::{Achievement, evaluate},
    clicks::MAX_TOTAL,
    error::AppError,
    state::AppState,
};

/// Largest admin bulk add accepted in one request.
pub const MAX_BULK_AMOUNT: u64 = 1_000_000;

#[derive(Serialize)]
pub struct ClickResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement: Option<Achievement>,
}

#[derive(Deserialize)]
pub struct ConfigPayload {
    value: String,
}

#[derive(Deserialize)]
pub struct ClicksPayload {
    amount: u64,
}

pub async fn view_handler(State(state): State<Arc<AppState>>) -> Json<CounterSnapshot> {
    Json(state.counter.read())
}

pub async fn up_handler() -> &'static str {
    "OK"
}

pub async fn click_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let total = state.counter.add(1).ok_or_else(|| {
        warn!(max = MAX_TOTAL, "Counter is full, click dropped");
        AppError::CounterFull
    })?;
    let achievement = evaluate(total);

    if achievement.is_some() {
        info!(total, "Milestone click");
    }

    Ok((
        StatusCode::CREATED,
        Json(ClickResponse {
            success: true,
            achievement,
        }),
    ))
}

pub async fn configs_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HashMap<String, String>>, AppError> {
    Ok(Json(state.configs.get_all().await?))
}

pub async fn config_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let value = state
        .configs
        .get(&key)
        .await
        .ok_or(AppError::ConfigNotFound)?;

    Ok(Json(json!({ "success": true, "data": value })))
}

pub async fn set_config_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    payload: Result<Json<ConfigPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;

    if key.trim().is_empty() || payload.value.trim().is_empty() {
        return Err(AppError::InvalidConfig);
    }

    state.configs.set(&key, &payload.value).await?;
    info!(key, "Config updated");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "value": payload.value })),
    ))
}

pub async fn add_clicks_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClicksPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::InvalidAmount)?;

    if payload.amount == 0 || payload.amount > MAX_BULK_AMOUNT {
        return Err(AppError::InvalidAmount);
    }

    let total = state
        .counter
        .add(payload.amount)
        .ok_or(AppError::InvalidAmount)?;
    info!(amount = payload.amount, total, "Clicks added by admin");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "clicks": total })),
    ))
}
