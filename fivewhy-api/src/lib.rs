//! fivewhy-api library - root-cause-analysis HTTP service
//!
//! Record management, search, analytics frequency tables and root-cause
//! prediction over a shared, hot-swappable inference engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use fivewhy_common::config::DEFAULT_REVIEW_THRESHOLD;
use fivewhy_ml::{ArtifactError, InferenceEngine, TrainedModelArtifact};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod analytics;
pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store
    pub db: SqlitePool,
    /// Current engine; replaced wholesale on reload
    engine: Arc<RwLock<Arc<InferenceEngine>>>,
    /// Artifact read by `POST /model/reload`
    pub model_path: PathBuf,
    /// Default review threshold when a request does not set one
    pub review_threshold: f64,
    /// Allowed browser origin
    pub cors_origin: Option<String>,
}

impl AppState {
    pub fn new(db: SqlitePool, engine: InferenceEngine, model_path: PathBuf) -> Self {
        Self {
            db,
            engine: Arc::new(RwLock::new(Arc::new(engine))),
            model_path,
            review_threshold: DEFAULT_REVIEW_THRESHOLD,
            cors_origin: None,
        }
    }

    pub fn with_review_threshold(mut self, threshold: f64) -> Self {
        self.review_threshold = threshold;
        self
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    /// Snapshot of the current engine; stays valid across a concurrent reload
    pub async fn engine(&self) -> Arc<InferenceEngine> {
        self.engine.read().await.clone()
    }

    pub async fn replace_engine(&self, engine: InferenceEngine) {
        *self.engine.write().await = Arc::new(engine);
    }
}

/// Load the artifact at `path` off the async runtime
pub async fn load_artifact(path: &Path) -> Result<TrainedModelArtifact, ArtifactError> {
    let path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || TrainedModelArtifact::load(&path)).await {
        Ok(result) => result,
        Err(e) => Err(ArtifactError::Inconsistent(format!("artifact loader failed: {}", e))),
    }
}

/// Engine for the artifact at `path`, or an unloaded engine when the
/// artifact is missing or unusable
pub async fn load_engine(path: &Path) -> InferenceEngine {
    if !path.exists() {
        warn!(
            "No model artifact at {}; predictions are disabled until one is trained",
            path.display()
        );
        return InferenceEngine::unloaded();
    }

    match load_artifact(path).await {
        Ok(artifact) => {
            info!(
                "✓ Loaded model {} ({} classes, trained {})",
                artifact.candidate(),
                artifact.label_encoder().classes().len(),
                artifact.created_at()
            );
            InferenceEngine::new(Arc::new(artifact))
        }
        Err(e) => {
            warn!("Failed to load model artifact {}: {}", path.display(), e);
            InferenceEngine::unloaded()
        }
    }
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!("Invalid CORS origin '{}', allowing any origin", origin);
            CorsLayer::permissive()
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.cors_origin.as_deref());

    Router::new()
        .merge(api::health_routes())
        .merge(api::record_routes())
        .merge(api::search_routes())
        .merge(api::analytics_routes())
        .merge(api::export_routes())
        .merge(api::predict_routes())
        .merge(api::model_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
