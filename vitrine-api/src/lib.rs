//! VITRINE API - REST Layer
//!
//! Axum routes over the content service: page reads, inline edits, cache
//! management and content administration. The PostgreSQL text store lives
//! in [`db`].

pub mod config;
pub mod db;
pub mod error;
pub mod macros;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::ApiConfig;
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use server::{serve, shutdown_signal};
pub use state::AppState;
pub use types::*;
