//! Model management endpoints

use std::sync::Arc;

use axum::{extract::State, routing::{get, post}, Json, Router};
use chrono::{DateTime, Utc};
use fivewhy_ml::InferenceEngine;
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::{load_artifact, AppState};

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub candidate: String,
    pub created_at: DateTime<Utc>,
    pub classes: Vec<String>,
    pub accuracy: f64,
}

/// GET /model
pub async fn model_info(State(state): State<AppState>) -> ApiResult<Json<ModelInfo>> {
    let engine = state.engine().await;
    let artifact = engine
        .artifact()
        .ok_or_else(|| ApiError::Inference(fivewhy_ml::InferenceError::ModelNotLoaded))?;

    Ok(Json(ModelInfo {
        candidate: artifact.candidate().to_string(),
        created_at: artifact.created_at(),
        classes: artifact.label_encoder().classes().to_vec(),
        accuracy: artifact.report().accuracy,
    }))
}

/// POST /model/reload
///
/// Reads the artifact from disk and swaps the engine. Requests already
/// holding the previous engine finish against it. A failed load leaves the
/// current engine in place.
pub async fn reload_model(State(state): State<AppState>) -> ApiResult<Json<ModelInfo>> {
    let artifact = load_artifact(&state.model_path).await?;
    info!(
        "Reloaded model {} from {}",
        artifact.candidate(),
        state.model_path.display()
    );

    state
        .replace_engine(InferenceEngine::new(Arc::new(artifact)))
        .await;
    model_info(State(state)).await
}

pub fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/model", get(model_info))
        .route("/model/reload", post(reload_model))
}
