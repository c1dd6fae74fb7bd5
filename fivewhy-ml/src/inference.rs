//! Inference engine
//!
//! Holds an immutable, shared artifact and answers single-case predictions.
//! Low confidence is not an error: the result is flagged for review while
//! the raw class and probabilities are still reported.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::artifact::TrainedModelArtifact;
use crate::encoder::{FeatureEncoder, FeatureSource};
use crate::models::argmax;
use crate::preprocess::FeatureError;

/// Confidence below which a prediction is flagged for human review
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Display label of a flagged prediction
pub const NEEDS_REVIEW_LABEL: &str = "Needs human review";

/// Number of ranked alternatives returned with every prediction
pub const TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("no trained model is loaded")]
    ModelNotLoaded,

    #[error("review threshold must be a finite number, got {0}")]
    InvalidThreshold(f64),

    #[error("failed to build features for the case: {source}")]
    Encoding {
        #[source]
        source: FeatureError,
    },
}

impl From<FeatureError> for InferenceError {
    fn from(source: FeatureError) -> Self {
        InferenceError::Encoding { source }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfidence {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// `predicted_class`, or [`NEEDS_REVIEW_LABEL`] below the threshold
    pub predicted_label: String,
    /// Most probable root cause regardless of the threshold
    pub predicted_class: String,
    pub class_id: usize,
    pub confidence: f64,
    /// Probability of every class, indexed by class id
    pub probabilities: Vec<f64>,
    pub top_predictions: Vec<LabelConfidence>,
    pub needs_review: bool,
}

#[derive(Debug, Clone)]
struct LoadedModel {
    artifact: Arc<TrainedModelArtifact>,
    encoder: FeatureEncoder,
}

#[derive(Debug, Clone)]
pub struct InferenceEngine {
    model: Option<LoadedModel>,
}

impl InferenceEngine {
    pub fn new(artifact: Arc<TrainedModelArtifact>) -> Self {
        let encoder = artifact.feature_encoder();
        Self {
            model: Some(LoadedModel { artifact, encoder }),
        }
    }

    /// Engine without a model; every prediction fails with `ModelNotLoaded`
    pub fn unloaded() -> Self {
        Self { model: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn artifact(&self) -> Option<&Arc<TrainedModelArtifact>> {
        self.model.as_ref().map(|m| &m.artifact)
    }

    pub fn predict<S: FeatureSource + ?Sized>(
        &self,
        source: &S,
        threshold: f64,
    ) -> Result<PredictionResult, InferenceError> {
        if !threshold.is_finite() {
            return Err(InferenceError::InvalidThreshold(threshold));
        }
        let model = self.model.as_ref().ok_or(InferenceError::ModelNotLoaded)?;
        let artifact = &model.artifact;

        let encoded = model.encoder.encode(source);
        let probabilities = artifact
            .pipeline()
            .predict_proba(std::slice::from_ref(&encoded))?
            .into_iter()
            .next()
            .ok_or(FeatureError::EmptyInput)?;

        let classes = artifact.label_encoder().classes();
        if probabilities.len() != classes.len() {
            return Err(FeatureError::DimensionMismatch {
                expected: classes.len(),
                found: probabilities.len(),
            }
            .into());
        }

        let class_id = argmax(&probabilities);
        let confidence = probabilities[class_id];
        let predicted_class = classes[class_id].clone();
        let needs_review = confidence < threshold;

        let mut ranked: Vec<usize> = (0..probabilities.len()).collect();
        ranked.sort_by(|&a, &b| {
            probabilities[b]
                .total_cmp(&probabilities[a])
                .then(a.cmp(&b))
        });
        let top_predictions = ranked
            .into_iter()
            .take(TOP_K)
            .map(|id| LabelConfidence {
                label: classes[id].clone(),
                confidence: probabilities[id],
            })
            .collect();

        Ok(PredictionResult {
            predicted_label: if needs_review {
                NEEDS_REVIEW_LABEL.to_string()
            } else {
                predicted_class.clone()
            },
            predicted_class,
            class_id,
            confidence,
            probabilities,
            top_predictions,
            needs_review,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::CaseDescription;

    #[test]
    fn test_unloaded_engine_rejects_predictions() {
        let engine = InferenceEngine::unloaded();
        assert!(!engine.is_loaded());
        assert!(engine.artifact().is_none());
        assert_eq!(
            engine.predict(&CaseDescription::new("pump noise"), DEFAULT_THRESHOLD),
            Err(InferenceError::ModelNotLoaded)
        );
    }

    #[test]
    fn test_encoding_error_keeps_cause() {
        use std::error::Error as _;
        let err = InferenceError::from(FeatureError::DimensionMismatch {
            expected: 3,
            found: 2,
        });
        assert!(err.source().is_some());
        assert!(err.to_string().contains("model expects 3"));
    }
}
