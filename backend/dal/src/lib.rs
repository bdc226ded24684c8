//! # Data Access Layer
//!
//! Internal HTTP service in front of the storage. Only the API server talks
//! to it, with the shared access token in `Authorization`.
//!
//! ## Storage
//! - `redis`: counter and configs in two Redis hashes, see [`database`]
//! - `memory`: process-local [`MemoryStore`], for development and tests
//!
//! ## Routes
//! Every route but `/up` needs the token, otherwise `403`.
//! ```text
//! GET  /clicks          { success, data: { daily, total } }
//! POST /clicks          { amount }        -> 201, post-add snapshot
//! GET  /configs         { success, data: { key: value } }
//! GET  /configs/{key}   { success, data: value }, 404 when absent
//! POST /configs         { key, value }    -> 201
//! POST /configs/{key}   { value }
//! PUT  /configs/{key}   { value }
//! GET  /up              OK
//! ```
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::get,
};
use tally::{BackingStore, MemoryStore, shutdown::shutdown_signal};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use config::{Backend, Config};
use database::RedisStore;
use middleware::require_token;
use routes::{
    create_config_handler, increment_clicks_handler, read_clicks_handler, read_config_handler,
    read_configs_handler, up_handler, update_config_handler,
};
use state::DalState;

pub fn router(state: Arc<DalState>) -> Router {
    Router::new()
        .route(
            "/clicks",
            get(read_clicks_handler).post(increment_clicks_handler),
        )
        .route(
            "/configs",
            get(read_configs_handler).post(create_config_handler),
        )
        .route(
            "/configs/{key}",
            get(read_config_handler)
                .post(update_config_handler)
                .put(update_config_handler),
        )
        .route_layer(from_fn_with_state(state.clone(), require_token))
        .route("/up", get(up_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn open_store(config: &Config) -> Result<Arc<dyn BackingStore>> {
    match config.backend {
        Backend::Redis => {
            info!("Connecting to Redis...");
            let store = RedisStore::connect(&config.redis_url, config.zone)
                .await
                .context("Failed to connect to Redis")?;
            store
                .initialize()
                .await
                .context("Failed to initialize Redis keys")?;

            Ok(Arc::new(store))
        }
        Backend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            let store = MemoryStore::new(config.zone);
            let store = database::DEFAULT_CONFIGS
                .into_iter()
                .fold(store, |store, (key, value)| store.with_config(key, value));

            Ok(Arc::new(store))
        }
    }
}

pub async fn start_dal() -> Result<()> {
    info!("Loading configuration...");
    let config = Config::load()?;

    let store = open_store(&config).await?;
    let state = DalState::new(store, config.access_token);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("DAL running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("DAL shutting down...");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{Client, StatusCode};
    use serde_json::{Value, json};
    use tally::{CounterSnapshot, RemoteStore};

    use super::*;

    const TOKEN: &str = "dal-token";

    async fn spawn(store: MemoryStore) -> String {
        let state = DalState::new(Arc::new(store), TOKEN.to_string());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router(state)).await.unwrap() });

        format!("http://{address}")
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_token() {
        let base = spawn(MemoryStore::default()).await;
        let client = Client::new();

        let missing = client.get(format!("{base}/clicks")).send().await.unwrap();
        assert_eq!(missing.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            missing.json::<Value>().await.unwrap(),
            json!({ "success": false, "error": "Invalid authorization header" })
        );

        let wrong = client
            .get(format!("{base}/configs"))
            .header("authorization", "Bearer nope")
            .send()
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

        let up = client.get(format!("{base}/up")).send().await.unwrap();
        assert_eq!(up.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn increment_answers_with_post_add_snapshot() {
        let base = spawn(MemoryStore::default().with_snapshot(CounterSnapshot::new(5000, 0, 0)))
            .await;
        let client = Client::new();

        let response = client
            .post(format!("{base}/clicks"))
            .header("authorization", TOKEN)
            .json(&json!({ "amount": 3 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: Value = response.json().await.unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["total"], 5003);
        assert_eq!(body["data"]["daily"]["amount"], 3);

        for amount in [0, u64::MAX] {
            let invalid = client
                .post(format!("{base}/clicks"))
                .header("authorization", TOKEN)
                .json(&json!({ "amount": amount }))
                .send()
                .await
                .unwrap();
            assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn config_routes() {
        let base = spawn(MemoryStore::default()).await;
        let client = Client::new();

        let created = client
            .post(format!("{base}/configs"))
            .header("authorization", TOKEN)
            .json(&json!({ "key": "support", "value": "a" }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let updated = client
            .put(format!("{base}/configs/support"))
            .header("authorization", TOKEN)
            .json(&json!({ "value": "b" }))
            .send()
            .await
            .unwrap();
        assert_eq!(updated.status(), StatusCode::OK);

        let read: Value = client
            .get(format!("{base}/configs/support"))
            .header("authorization", TOKEN)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(read, json!({ "success": true, "data": "b" }));

        let missing = client
            .get(format!("{base}/configs/nothing"))
            .header("authorization", TOKEN)
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn remote_store_talks_to_dal() {
        let base = spawn(MemoryStore::default().with_config("support", "link")).await;
        let store = RemoteStore::new(&base, TOKEN, Duration::from_secs(2)).unwrap();

        let snapshot = store.increment_counter(7).await.unwrap();
        assert_eq!(snapshot.total, 7);
        assert_eq!(store.read_counter().await.unwrap(), snapshot);

        assert_eq!(
            store.read_config("support").await.unwrap().as_deref(),
            Some("link")
        );
        assert_eq!(store.read_config("absent").await.unwrap(), None);

        store.write_config("servicestatus", "up").await.unwrap();
        let all = store.read_all_configs().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["servicestatus"], "up");
    }
}
