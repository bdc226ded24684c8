use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tally::{
    CounterSnapshot,
    models::{ConfigValue, ConfigWrite, Envelope, IncrementRequest},
};
use tracing::{debug, info};

use crate::{error::DalError, state::DalState};

fn valid(text: &str) -> bool {
    !text.trim().is_empty()
}

pub async fn up_handler() -> &'static str {
    "OK"
}

pub async fn read_clicks_handler(
    State(state): State<Arc<DalState>>,
) -> Result<Json<Envelope<CounterSnapshot>>, DalError> {
    Ok(Json(Envelope::ok(state.store.read_counter().await?)))
}

pub async fn increment_clicks_handler(
    State(state): State<Arc<DalState>>,
    payload: Result<Json<IncrementRequest>, JsonRejection>,
) -> Result<impl IntoResponse, DalError> {
    let Json(IncrementRequest { amount }) = payload.map_err(|_| DalError::InvalidBody)?;

    // Redis counters are signed 64-bit
    if amount == 0 || amount > i64::MAX as u64 {
        return Err(DalError::InvalidBody);
    }

    let snapshot = state.store.increment_counter(amount).await?;
    debug!(amount, total = snapshot.total, "Clicks applied");

    Ok((StatusCode::CREATED, Json(Envelope::ok(snapshot))))
}

pub async fn read_configs_handler(
    State(state): State<Arc<DalState>>,
) -> Result<Json<Envelope<HashMap<String, String>>>, DalError> {
    Ok(Json(Envelope::ok(state.store.read_all_configs().await?)))
}

pub async fn read_config_handler(
    State(state): State<Arc<DalState>>,
    Path(key): Path<String>,
) -> Result<Json<Envelope<String>>, DalError> {
    let value = state
        .store
        .read_config(&key)
        .await?
        .ok_or(DalError::NotFound)?;

    Ok(Json(Envelope::ok(value)))
}

pub async fn create_config_handler(
    State(state): State<Arc<DalState>>,
    payload: Result<Json<ConfigWrite>, JsonRejection>,
) -> Result<impl IntoResponse, DalError> {
    let Json(write) = payload.map_err(|_| DalError::InvalidBody)?;

    if !valid(&write.key) || !valid(&write.value) {
        return Err(DalError::InvalidBody);
    }

    state.store.write_config(&write.key, &write.value).await?;
    info!(key = write.key, "Config created");

    Ok((StatusCode::CREATED, Json(Envelope::ok(write))))
}

pub async fn update_config_handler(
    State(state): State<Arc<DalState>>,
    Path(key): Path<String>,
    payload: Result<Json<ConfigValue>, JsonRejection>,
) -> Result<Json<Envelope<ConfigWrite>>, DalError> {
    let Json(ConfigValue { value }) = payload.map_err(|_| DalError::InvalidBody)?;

    if !valid(&key) || !valid(&value) {
        return Err(DalError::InvalidBody);
    }

    state.store.write_config(&key, &value).await?;
    info!(key, "Config updated");

    Ok(Json(Envelope::ok(ConfigWrite { key, value })))
}
