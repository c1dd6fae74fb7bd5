//! Banner and health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use fivewhy_common::db;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub message: String,
    pub status: String,
    pub version: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// "loaded" or "not loaded"
    pub model: String,
    /// "connected" or "disconnected"
    pub database: String,
    pub records: i64,
}

/// GET /
pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Root Cause Analysis API".to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health
///
/// Always answers 200; model and database state are reported in the body.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.engine().await;
    let connected = db::ping(&state.db).await;
    let records = if connected {
        db::count_records(&state.db).await.unwrap_or_else(|e| {
            warn!("Health check could not count records: {}", e);
            0
        })
    } else {
        0
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "fivewhy-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: (if engine.is_loaded() { "loaded" } else { "not loaded" }).to_string(),
        database: (if connected { "connected" } else { "disconnected" }).to_string(),
        records,
    })
}

/// Build banner and health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
}
