//! Root-cause prediction endpoints
//!
//! The engine answers with a class and its probabilities; the 5-why chain
//! and corrective action are taken from stored records sharing the
//! predicted root cause.

use axum::{extract::State, routing::post, Json, Router};
use fivewhy_common::{db, Record};
use fivewhy_ml::{CaseDescription, LabelConfidence, PredictionResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Shortest accepted description (after trimming)
pub const MIN_DESCRIPTION_LEN: usize = 5;

/// Stored records consulted for the 5-why backfill
pub const SAMPLE_LIMIT: i64 = 3;

const NO_DETAILS: &str = "No details available";
const NO_SOLUTION: &str = "No solution documented";

/// POST /predict body; categorical context takes its defaults
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub description: String,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// POST /predict-enhanced body
#[derive(Debug, Deserialize)]
pub struct EnhancedPredictRequest {
    pub description: String,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub equipment_type: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub operating_load: Option<String>,
    #[serde(default)]
    pub recent_maintenance: Option<String>,
    #[serde(default)]
    pub shift_time: Option<String>,
    #[serde(default)]
    pub machine_age_bucket: Option<String>,
    #[serde(default)]
    pub maintenance_gap_days: Option<String>,
    #[serde(default)]
    pub failure_frequency: Option<String>,
}

impl EnhancedPredictRequest {
    fn into_case(self) -> (CaseDescription, Option<f64>) {
        let case = CaseDescription {
            issue: self.description,
            equipment_type: self.equipment_type,
            department: self.department,
            severity: self.severity,
            environment: self.environment,
            operating_load: self.operating_load,
            recent_maintenance: self.recent_maintenance,
            shift_time: self.shift_time,
            machine_age_bucket: self.machine_age_bucket,
            maintenance_gap_days: self.maintenance_gap_days,
            failure_frequency: self.failure_frequency,
        };
        (case, self.threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiveWhy {
    pub why1: String,
    pub why2: String,
    pub why3: String,
    pub why4: String,
    pub why5: String,
    pub solution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl FiveWhy {
    fn unavailable() -> Self {
        Self {
            why1: NO_DETAILS.to_string(),
            why2: NO_DETAILS.to_string(),
            why3: NO_DETAILS.to_string(),
            why4: NO_DETAILS.to_string(),
            why5: NO_DETAILS.to_string(),
            solution: NO_SOLUTION.to_string(),
            equipment_type: None,
            department: None,
        }
    }

    fn from_record(record: &Record) -> Self {
        Self {
            why1: record.why1.clone(),
            why2: record.why2.clone(),
            why3: record.why3.clone(),
            why4: record.why4.clone(),
            why5: record.why5.clone(),
            solution: record.solution.clone(),
            equipment_type: Some(record.equipment_type.clone()),
            department: Some(record.department.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    /// Predicted root cause, or "Needs human review" below the threshold
    pub predicted_label: String,
    pub predicted_class: String,
    pub confidence: f64,
    pub top_predictions: Vec<LabelConfidence>,
    pub needs_review: bool,
    pub five_why: FiveWhy,
    pub sample_matches: usize,
}

fn check_request(description: &str, threshold: Option<f64>) -> ApiResult<()> {
    if description.trim().chars().count() < MIN_DESCRIPTION_LEN {
        return Err(ApiError::BadRequest("Description too short".to_string()));
    }
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ApiError::BadRequest(format!(
                "threshold must be within [0, 1], got {}",
                threshold
            )));
        }
    }
    Ok(())
}

async fn respond(
    state: &AppState,
    case: CaseDescription,
    threshold: Option<f64>,
) -> ApiResult<Json<PredictResponse>> {
    check_request(&case.issue, threshold)?;
    let threshold = threshold.unwrap_or(state.review_threshold);

    let engine = state.engine().await;
    let prediction: PredictionResult =
        tokio::task::spawn_blocking(move || engine.predict(&case, threshold))
            .await
            .map_err(|e| ApiError::Internal(format!("Prediction task failed: {}", e)))??;

    let samples = db::find_records_by_label(&state.db, &prediction.predicted_class, SAMPLE_LIMIT)
        .await?;
    let five_why = samples
        .first()
        .map(FiveWhy::from_record)
        .unwrap_or_else(FiveWhy::unavailable);
    debug!(
        "Backfilled 5-why from {} stored record(s) for {}",
        samples.len(),
        prediction.predicted_class
    );

    info!(
        "Predicted {} (confidence {:.3}{})",
        prediction.predicted_class,
        prediction.confidence,
        if prediction.needs_review { ", needs review" } else { "" }
    );

    Ok(Json(PredictResponse {
        predicted_label: prediction.predicted_label,
        predicted_class: prediction.predicted_class,
        confidence: prediction.confidence,
        top_predictions: prediction.top_predictions,
        needs_review: prediction.needs_review,
        five_why,
        sample_matches: samples.len(),
    }))
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Json<PredictResponse>> {
    respond(&state, CaseDescription::new(request.description), request.threshold).await
}

/// POST /predict-enhanced
pub async fn predict_enhanced(
    State(state): State<AppState>,
    Json(request): Json<EnhancedPredictRequest>,
) -> ApiResult<Json<PredictResponse>> {
    let (case, threshold) = request.into_case();
    respond(&state, case, threshold).await
}

pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/predict-enhanced", post(predict_enhanced))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_length_is_checked_after_trimming() {
        assert!(check_request("   abcd   ", None).is_err());
        assert!(check_request("abcde", None).is_ok());
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(check_request("pump vibration", Some(-0.1)).is_err());
        assert!(check_request("pump vibration", Some(1.5)).is_err());
        assert!(check_request("pump vibration", Some(f64::NAN)).is_err());
        assert!(check_request("pump vibration", Some(1.0)).is_ok());
    }

    #[test]
    fn test_missing_samples_fall_back() {
        let five_why = FiveWhy::unavailable();
        assert_eq!(five_why.why3, NO_DETAILS);
        assert_eq!(five_why.solution, NO_SOLUTION);
        assert!(five_why.department.is_none());
    }
}
