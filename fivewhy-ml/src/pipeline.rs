//! Preprocessor + classifier, fitted together
//!
//! Fitting runs preprocessing, then SMOTE on the training matrix only, then
//! the classifier. Prediction never oversamples.

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::encoder::EncodedRecord;
use crate::models::{argmax, FittedModel, ModelError, ModelSpec};
use crate::preprocess::{FeatureError, Preprocessor};
use crate::smote::Smote;
use crate::text::TfidfConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("feature construction failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("classifier fit failed: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    candidate: String,
    preprocessor: Preprocessor,
    model: FittedModel,
}

impl Pipeline {
    pub fn fit<R: Rng>(
        spec: &ModelSpec,
        tfidf: &TfidfConfig,
        smote: &Smote,
        samples: &[EncodedRecord],
        labels: &[usize],
        n_classes: usize,
        rng: &mut R,
    ) -> Result<Self, PipelineError> {
        let preprocessor = Preprocessor::fit(tfidf, samples)?;
        let features = preprocessor.transform(samples)?;
        let (features, labels) = smote.resample(&features, labels, n_classes, rng);

        debug!(
            "Fitting {} on {} rows x {} features",
            spec.name(),
            features.nrows(),
            features.ncols()
        );
        let model = spec.fit(&features, &labels, n_classes, rng)?;

        Ok(Self {
            candidate: spec.name().to_string(),
            preprocessor,
            model,
        })
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn n_classes(&self) -> usize {
        self.model.n_classes()
    }

    /// Class probability rows, one per sample
    pub fn predict_proba(&self, samples: &[EncodedRecord]) -> Result<Vec<Vec<f64>>, FeatureError> {
        let features = self.features(samples)?;
        Ok(features
            .rows()
            .into_iter()
            .map(|row| self.model.predict_proba(row))
            .collect())
    }

    pub fn predict(&self, samples: &[EncodedRecord]) -> Result<Vec<usize>, FeatureError> {
        Ok(self
            .predict_proba(samples)?
            .iter()
            .map(|p| argmax(p))
            .collect())
    }

    fn features(&self, samples: &[EncodedRecord]) -> Result<Array2<f64>, FeatureError> {
        let features = self.preprocessor.transform(samples)?;
        if features.ncols() != self.model.n_features() {
            return Err(FeatureError::DimensionMismatch {
                expected: self.model.n_features(),
                found: features.ncols(),
            });
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{CaseDescription, FeatureEncoder};
    use crate::models::LogisticParams;
    use fivewhy_common::CategoricalField;
    use rand::{rngs::StdRng, SeedableRng};

    fn training_set() -> (Vec<EncodedRecord>, Vec<usize>) {
        let encoder = FeatureEncoder::new(vec![CategoricalField::Environment]);
        let cases = [
            ("bearing dry squeal grease", "dusty", 0),
            ("bearing grease low squeal", "dusty", 0),
            ("dry bearing grease missing", "dusty", 0),
            ("sensor reading drift calibration", "clean", 1),
            ("calibration sensor offset drift", "clean", 1),
        ];
        let samples = cases
            .iter()
            .map(|(issue, env, _)| {
                encoder.encode(&CaseDescription::new(*issue).with(CategoricalField::Environment, *env))
            })
            .collect();
        (samples, cases.iter().map(|c| c.2).collect())
    }

    fn tfidf() -> TfidfConfig {
        TfidfConfig {
            min_df: 0.0,
            max_df: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_fit_and_predict() {
        let (samples, labels) = training_set();
        let spec = ModelSpec::LogisticRegression(LogisticParams {
            c: 10.0,
            ..Default::default()
        });
        let pipeline = Pipeline::fit(
            &spec,
            &tfidf(),
            &Smote::default(),
            &samples,
            &labels,
            2,
            &mut StdRng::seed_from_u64(42),
        )
        .unwrap();

        assert_eq!(pipeline.candidate(), "logistic_regression");
        assert_eq!(pipeline.predict(&samples).unwrap(), labels);

        let probabilities = pipeline.predict_proba(&samples[..1]).unwrap();
        assert_eq!(probabilities.len(), 1);
        assert!((probabilities[0].iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_training_set_is_feature_error() {
        let spec = ModelSpec::LogisticRegression(LogisticParams::default());
        let err = Pipeline::fit(
            &spec,
            &tfidf(),
            &Smote::default(),
            &[],
            &[],
            2,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert_eq!(err, PipelineError::Feature(FeatureError::EmptyInput));
    }
}
