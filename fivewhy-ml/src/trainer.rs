//! Trainer / selector
//!
//! Encodes the labelled records, holds out a stratified test split, scores
//! every registry candidate by stratified k-fold cross-validation on the
//! training split, refits the best one on the whole training split and
//! evaluates it once on the held-out rows.
//!
//! Every random draw comes from RNGs seeded from [`TrainingConfig::seed`],
//! so a run is reproducible for a given dataset and configuration.

use fivewhy_common::Record;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::artifact::TrainedModelArtifact;
use crate::encoder::{EncodedRecord, FeatureEncoder};
use crate::labels::LabelEncoder;
use crate::metrics::{accuracy, CandidateScore, EvaluationReport};
use crate::models::ModelSpec;
use crate::pipeline::{Pipeline, PipelineError};
use crate::preprocess::FeatureError;
use crate::smote::Smote;
use crate::split::{stratified_k_fold, stratified_split};
use crate::text::TfidfConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub seed: u64,
    /// Fraction of every class held out for the final evaluation
    pub test_fraction: f64,
    /// Upper bound on cross-validation folds
    pub cv_folds: usize,
    pub smote: Smote,
    pub tfidf: TfidfConfig,
    /// Candidates in priority order
    pub candidates: Vec<ModelSpec>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            cv_folds: 3,
            smote: Smote::default(),
            tfidf: TfidfConfig::default(),
            candidates: ModelSpec::default_registry(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingError {
    #[error("insufficient data: {reason} (class counts: {})", format_counts(.class_counts))]
    InsufficientData {
        reason: String,
        class_counts: BTreeMap<String, usize>,
    },

    #[error(
        "stratified split failed: root cause '{label}' has {count} sample(s) (class counts: {})",
        format_counts(.class_counts)
    )]
    Stratification {
        label: String,
        count: usize,
        class_counts: BTreeMap<String, usize>,
    },

    #[error("feature encoding failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("no candidate could be fitted (class counts: {})", format_counts(.class_counts))]
    NoCandidate { class_counts: BTreeMap<String, usize> },

    #[error("fitting selected candidate {candidate} failed: {source}")]
    Fit {
        candidate: String,
        #[source]
        source: PipelineError,
    },
}

fn format_counts(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(label, count)| format!("{}={}", label, count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// splitmix64 step: independent seeds for every candidate/fold stream
fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed.wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn select<T: Clone>(items: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&i| items[i].clone()).collect()
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn train(&self, records: &[Record]) -> Result<TrainedModelArtifact, TrainingError> {
        let config = &self.config;

        let labelled: Vec<&Record> = records
            .iter()
            .filter(|r| !r.root_cause.trim().is_empty())
            .collect();
        if labelled.len() < records.len() {
            warn!(
                "Skipping {} record(s) without a root cause",
                records.len() - labelled.len()
            );
        }

        let labels: Vec<&str> = labelled.iter().map(|r| r.root_cause.trim()).collect();
        let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
        for label in &labels {
            *class_counts.entry(label.to_string()).or_insert(0) += 1;
        }
        info!(
            "Training on {} records across {} root causes",
            labelled.len(),
            class_counts.len()
        );
        debug!("Class distribution: {}", format_counts(&class_counts));

        if class_counts.len() < 2 {
            return Err(TrainingError::InsufficientData {
                reason: format!(
                    "need at least 2 distinct root causes, found {}",
                    class_counts.len()
                ),
                class_counts,
            });
        }

        let encoder = FeatureEncoder::for_training(&labelled);
        let samples: Vec<EncodedRecord> = labelled.iter().map(|r| encoder.encode(*r)).collect();
        let (label_encoder, y) = LabelEncoder::fit_transform(&labels);
        let classes = label_encoder.classes().to_vec();
        let n_classes = classes.len();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let split = stratified_split(&y, n_classes, config.test_fraction, &mut rng).map_err(|e| {
            TrainingError::Stratification {
                label: classes[e.class].clone(),
                count: e.count,
                class_counts: class_counts.clone(),
            }
        })?;

        let train_samples = select(&samples, &split.train);
        let train_y = select(&y, &split.train);
        let test_samples = select(&samples, &split.test);
        let test_y = select(&y, &split.test);
        info!(
            "Stratified split: {} training rows, {} test rows",
            train_y.len(),
            test_y.len()
        );

        let smallest = crate::models::class_counts(&train_y, n_classes)
            .into_iter()
            .min()
            .unwrap_or(0);
        let folds = config.cv_folds.min(smallest);
        if folds < 2 {
            return Err(TrainingError::InsufficientData {
                reason: format!(
                    "smallest class has {} training sample(s), cross-validation needs at least 2 folds",
                    smallest
                ),
                class_counts,
            });
        }
        let fold_splits = stratified_k_fold(&train_y, n_classes, folds, &mut rng);
        info!("Scoring {} candidates with {}-fold cross-validation", config.candidates.len(), folds);

        let mut scores: Vec<CandidateScore> = Vec::with_capacity(config.candidates.len());
        let mut best: Option<(usize, f64)> = None;
        for (index, spec) in config.candidates.iter().enumerate() {
            let mut fold_scores = Vec::with_capacity(fold_splits.len());
            let mut failure = None;

            for (fold, split) in fold_splits.iter().enumerate() {
                let stream = ((index as u64) << 32) | fold as u64;
                let mut fold_rng = StdRng::seed_from_u64(derive_seed(config.seed, stream));
                let fitted = Pipeline::fit(
                    spec,
                    &config.tfidf,
                    &config.smote,
                    &select(&train_samples, &split.train),
                    &select(&train_y, &split.train),
                    n_classes,
                    &mut fold_rng,
                );
                let predicted = fitted.and_then(|pipeline| {
                    pipeline
                        .predict(&select(&train_samples, &split.test))
                        .map_err(PipelineError::from)
                });
                match predicted {
                    Ok(predicted) => {
                        fold_scores.push(accuracy(&select(&train_y, &split.test), &predicted))
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            if let Some(e) = failure {
                warn!("Candidate {} skipped: {}", spec.name(), e);
                continue;
            }

            let score = CandidateScore::new(spec.name(), fold_scores);
            info!(
                "Candidate {}: mean CV accuracy {:.4} (folds: {:?})",
                score.name, score.mean, score.fold_scores
            );
            if best.map_or(true, |(_, mean)| score.mean > mean) {
                best = Some((index, score.mean));
            }
            scores.push(score);
        }

        let Some((best_index, best_mean)) = best else {
            return Err(TrainingError::NoCandidate { class_counts });
        };
        let spec = &config.candidates[best_index];
        info!("Selected {} (mean CV accuracy {:.4})", spec.name(), best_mean);

        let mut final_rng = StdRng::seed_from_u64(derive_seed(config.seed, u64::MAX));
        let pipeline = Pipeline::fit(
            spec,
            &config.tfidf,
            &config.smote,
            &train_samples,
            &train_y,
            n_classes,
            &mut final_rng,
        )
        .map_err(|source| TrainingError::Fit {
            candidate: spec.name().to_string(),
            source,
        })?;

        let predicted = pipeline.predict(&test_samples)?;
        let report = EvaluationReport::compute(&test_y, &predicted, &classes);
        info!("Held-out accuracy: {:.4}", report.accuracy);
        info!("Held-out evaluation:\n{}", report);

        Ok(TrainedModelArtifact::new(
            pipeline,
            label_encoder,
            &encoder,
            scores,
            report,
            class_counts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: usize, root_cause: &str) -> Record {
        Record {
            equipment_id: format!("EQ-{}", id),
            issue: format!("issue {}", id),
            root_cause: root_cause.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_class_is_insufficient() {
        let records: Vec<Record> = (0..5).map(|i| record(i, "Wear")).collect();
        let err = Trainer::new(TrainingConfig::default()).train(&records).unwrap_err();
        assert!(matches!(err, TrainingError::InsufficientData { .. }));
        assert!(err.to_string().contains("Wear=5"));
    }

    #[test]
    fn test_singleton_class_fails_stratification() {
        let mut records: Vec<Record> = (0..5).map(|i| record(i, "Wear")).collect();
        records.push(record(5, "Misalignment"));
        let err = Trainer::new(TrainingConfig::default()).train(&records).unwrap_err();
        match err {
            TrainingError::Stratification { label, count, .. } => {
                assert_eq!(label, "Misalignment");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_two_per_class_leaves_too_few_for_cv() {
        let records = vec![
            record(0, "Wear"),
            record(1, "Wear"),
            record(2, "Misalignment"),
            record(3, "Misalignment"),
        ];
        let err = Trainer::new(TrainingConfig::default()).train(&records).unwrap_err();
        assert!(matches!(err, TrainingError::InsufficientData { .. }));
    }

    #[test]
    fn test_unlabelled_records_are_ignored() {
        let mut records: Vec<Record> = (0..4).map(|i| record(i, "Wear")).collect();
        records.push(record(9, "  "));
        let err = Trainer::new(TrainingConfig::default()).train(&records).unwrap_err();
        assert!(err.to_string().contains("found 1"));
    }

    #[test]
    fn test_derived_seeds_differ() {
        assert_ne!(derive_seed(42, 0), derive_seed(42, 1));
        assert_ne!(derive_seed(42, 0), derive_seed(43, 0));
    }
}
