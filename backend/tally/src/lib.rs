//! # Tally
//!
//! Shared pieces between the public API server and the data access layer (DAL).
//!
//! - [`auth`]: shared token check for admin and DAL routes
//! - [`models`]: wire payloads, the counter snapshot and the DAL envelope
//! - [`store`]: the [`BackingStore`] seam the buffered counter and config cache talk to
//! - [`day`]: calendar day rollover for the daily amount
//! - [`memory`]: in-process store, used by the DAL in dev mode and by tests
//! - [`remote`]: HTTP client for the DAL
//! - [`settings`]: environment and docker secret loading
//! - [`shutdown`]: graceful shutdown signal
//! - [`telemetry`]: tracing setup shared by every binary
pub mod auth;
pub mod day;
pub mod error;
pub mod memory;
pub mod models;
pub mod remote;
pub mod settings;
pub mod shutdown;
pub mod store;
pub mod telemetry;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{CounterSnapshot, Daily};
pub use remote::RemoteStore;
pub use store::BackingStore;
