//! Public API of the salavat click counter.
//!
//!
//!
//! # General Infrastructure
//! - Frontend talks to this server only, never to the DAL
//! - This server talks to the DAL over the internal network with a shared access token
//! - The DAL is the only thing that touches Redis
//! - Exactly one API server instance, the click buffer lives in its memory
//!
//!
//!
//! # Preventing DAL Overload
//!
//! **Goal**: Clicks arrive in bursts, far faster than we want to write them.
//!
//! - `POST /click` only bumps an in-memory pending delta, no I/O
//! - Every 500ms the sync job sends the whole delta to the DAL in one atomic add
//! - `GET /` is answered from memory as snapshot + pending
//! - Config lookups are memoized and the memo is thrown away every 5s
//! - Each client gets 40 clicks per minute, past that `429`
//!
//!
//!
//! # Notes
//!
//! ## Eventual Consistency
//! Storage lags behind what users see by at most one sync interval. If the
//! process dies, clicks buffered since the last sync are gone. That is the
//! price for never waiting on the DAL in the click path.
//!
//! ## Achievements
//! The click that brings the total to a multiple of 1000 is told so in its
//! response. The check runs on the optimistic in-memory total.
//!
//!
//!
//! # Routes
//!
//! Public.
//! ```text
//! GET  /               { daily: { amount, lastUpdate }, total }
//! GET  /up             OK
//! POST /click          { success, achievement? }, rate limited
//! GET  /configs        { key: value }
//! GET  /configs/{key}  { success, data }
//! ```
//!
//! Admin, `Authorization: <token>` or `Authorization: Bearer <token>`.
//! ```text
//! POST /configs/{key}  { value }
//! POST /clicks         { amount }
//! ```
use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    handler::Handler,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tally::{RemoteStore, shutdown::shutdown_signal};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

pub mod achievement;
pub mod clicks;
pub mod config;
pub mod configs;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod utils;

#[cfg(test)]
mod testing;

use config::Config;
use jobs::{spawn_cache_clear_job, spawn_sync_job};
use middleware::{rate_limit, require_admin};
use routes::{
    add_clicks_handler, click_handler, config_handler, configs_handler, set_config_handler,
    up_handler, view_handler,
};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let limited = from_fn_with_state(state.clone(), rate_limit);
    let admin = from_fn_with_state(state.clone(), require_admin);

    Router::new()
        .route("/", get(view_handler))
        .route("/up", get(up_handler))
        .route("/click", post(click_handler.layer(limited)))
        .route("/configs", get(configs_handler))
        .route(
            "/configs/{key}",
            get(config_handler).post(set_config_handler.layer(admin.clone())),
        )
        .route("/clicks", post(add_clicks_handler.layer(admin)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    info!("Loading configuration...");
    let config = Config::load()?;

    let store = RemoteStore::new(&config.dal_endpoint, &config.dal_token, config.dal_timeout)
        .context("Failed to build data layer client")?;

    info!("Initializing state...");
    let state = AppState::new(config, Arc::new(store));

    match state.counter.load_snapshot().await {
        Ok(snapshot) => info!(
            total = snapshot.total,
            daily = snapshot.daily.amount,
            "Loaded click data from data layer"
        ),
        Err(e) => error!(error = %e, "Failed to load click data, starting from an empty snapshot"),
    }

    let jobs = [
        spawn_sync_job(state.counter.clone(), state.config.sync_interval),
        spawn_cache_clear_job(state.configs.clone(), state.config.cache_clear_interval),
    ];

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutting down...");

    for job in jobs {
        job.stop().await;
    }

    // Best effort, whatever fails here is lost with the process
    match state.counter.flush().await {
        Ok(amount) => info!(amount, "Final sync done"),
        Err(e) => error!(error = %e, pending = state.counter.pending(), "Final sync failed"),
    }

    Ok(())
}
