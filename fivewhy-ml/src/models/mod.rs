//! Candidate classifiers
//!
//! Every candidate consumes a dense feature matrix and class ids and produces
//! a fitted model that maps one feature row to a probability vector over all
//! classes (summing to 1). [`ModelSpec`] is the untrained configuration kept
//! in the candidate registry; [`FittedModel`] is what ends up in the artifact.

pub mod boosting;
pub mod forest;
pub mod logistic;
pub mod svm;
pub mod tree;

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use boosting::{BoostedTrees, BoostingParams, SplitCriterion};
pub use forest::{ForestParams, RandomForest};
pub use logistic::{LogisticParams, LogisticRegression};
pub use svm::{KernelSvm, SvmParams};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("{labels} labels for {rows} feature rows")]
    LabelCount { rows: usize, labels: usize },

    #[error("class id {class} out of range for {n_classes} classes")]
    ClassOutOfRange { class: usize, n_classes: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("solver failed: {0}")]
    Solver(String),
}

/// Untrained candidate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    RandomForest(ForestParams),
    LogisticRegression(LogisticParams),
    SvmRbf(SvmParams),
    GradientBoosting(BoostingParams),
    Xgboost(BoostingParams),
}

impl ModelSpec {
    /// Candidate registry in selection priority order (ties go to the earliest)
    pub fn default_registry() -> Vec<ModelSpec> {
        vec![
            ModelSpec::RandomForest(ForestParams::default()),
            ModelSpec::LogisticRegression(LogisticParams::default()),
            ModelSpec::SvmRbf(SvmParams::default()),
            ModelSpec::GradientBoosting(BoostingParams::gradient_boosting()),
            ModelSpec::Xgboost(BoostingParams::xgboost()),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelSpec::RandomForest(_) => "random_forest",
            ModelSpec::LogisticRegression(_) => "logistic_regression",
            ModelSpec::SvmRbf(_) => "svm_rbf",
            ModelSpec::GradientBoosting(_) => "gradient_boosting",
            ModelSpec::Xgboost(_) => "xgboost",
        }
    }

    pub fn fit<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        rng: &mut R,
    ) -> Result<FittedModel, ModelError> {
        check_training_set(x, y, n_classes)?;
        Ok(match self {
            ModelSpec::RandomForest(params) => {
                FittedModel::RandomForest(RandomForest::fit(params, x, y, n_classes, rng)?)
            }
            ModelSpec::LogisticRegression(params) => {
                FittedModel::LogisticRegression(LogisticRegression::fit(params, x, y, n_classes)?)
            }
            ModelSpec::SvmRbf(params) => {
                FittedModel::SvmRbf(KernelSvm::fit(params, x, y, n_classes)?)
            }
            ModelSpec::GradientBoosting(params) | ModelSpec::Xgboost(params) => {
                FittedModel::Boosting(BoostedTrees::fit(params, x, y, n_classes, rng)?)
            }
        })
    }
}

/// Trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
    SvmRbf(KernelSvm),
    Boosting(BoostedTrees),
}

impl FittedModel {
    pub fn n_features(&self) -> usize {
        match self {
            FittedModel::RandomForest(m) => m.n_features(),
            FittedModel::LogisticRegression(m) => m.n_features(),
            FittedModel::SvmRbf(m) => m.n_features(),
            FittedModel::Boosting(m) => m.n_features(),
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            FittedModel::RandomForest(m) => m.n_classes(),
            FittedModel::LogisticRegression(m) => m.n_classes(),
            FittedModel::SvmRbf(m) => m.n_classes(),
            FittedModel::Boosting(m) => m.n_classes(),
        }
    }

    /// Class probabilities for one feature row of width `n_features()`
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        match self {
            FittedModel::RandomForest(m) => m.predict_proba(row),
            FittedModel::LogisticRegression(m) => m.predict_proba(row),
            FittedModel::SvmRbf(m) => m.predict_proba(row),
            FittedModel::Boosting(m) => m.predict_proba(row),
        }
    }
}

fn check_training_set(x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<(), ModelError> {
    if x.nrows() == 0 {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::LabelCount {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if let Some(&class) = y.iter().find(|&&c| c >= n_classes) {
        return Err(ModelError::ClassOutOfRange { class, n_classes });
    }
    Ok(())
}

/// Number of samples per class
pub fn class_counts(y: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &class in y {
        if class < n_classes {
            counts[class] += 1;
        }
    }
    counts
}

/// Numerically stable softmax
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![1.0 / scores.len().max(1) as f64; scores.len()];
    }
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the lowest index wins ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 1000.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > 0.99);
    }

    #[test]
    fn test_argmax_prefers_lowest_index_on_tie() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
    }

    #[test]
    fn test_registry_order() {
        let names: Vec<&str> = ModelSpec::default_registry().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["random_forest", "logistic_regression", "svm_rbf", "gradient_boosting", "xgboost"]
        );
    }

    #[test]
    fn test_fit_rejects_bad_labels() {
        let x = Array2::<f64>::zeros((2, 1));
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let spec = ModelSpec::LogisticRegression(LogisticParams::default());
        assert_eq!(
            spec.fit(&x, &[0], 2, &mut rng).unwrap_err(),
            ModelError::LabelCount { rows: 2, labels: 1 }
        );
        assert_eq!(
            spec.fit(&x, &[0, 5], 2, &mut rng).unwrap_err(),
            ModelError::ClassOutOfRange { class: 5, n_classes: 2 }
        );
    }
}
