//! Trained model artifact
//!
//! The artifact is the only thing inference needs: the fitted pipeline, the
//! label encoder, and the categorical column list with its defaults table,
//! plus the training report for display. It is immutable once built and is
//! replaced as a whole, never patched.
//!
//! On disk it is a JSON document written to a sibling temp file, synced, and
//! renamed over the target, so readers never observe a partial artifact.

use chrono::{DateTime, Utc};
use fivewhy_common::CategoricalField;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::encoder::FeatureEncoder;
use crate::labels::LabelEncoder;
use crate::metrics::{CandidateScore, EvaluationReport};
use crate::pipeline::Pipeline;

/// Bumped whenever the serialized layout changes
pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported artifact format version {found} (expected {expected})")]
    FormatVersion { found: u32, expected: u32 },

    #[error("inconsistent artifact: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModelArtifact {
    format_version: u32,
    created_at: DateTime<Utc>,
    candidate: String,
    cv_scores: Vec<CandidateScore>,
    report: EvaluationReport,
    class_counts: BTreeMap<String, usize>,
    pipeline: Pipeline,
    label_encoder: LabelEncoder,
    categorical_columns: Vec<CategoricalField>,
    defaults: Vec<(CategoricalField, String)>,
}

impl TrainedModelArtifact {
    pub fn new(
        pipeline: Pipeline,
        label_encoder: LabelEncoder,
        encoder: &FeatureEncoder,
        cv_scores: Vec<CandidateScore>,
        report: EvaluationReport,
        class_counts: BTreeMap<String, usize>,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            candidate: pipeline.candidate().to_string(),
            cv_scores,
            report,
            class_counts,
            pipeline,
            label_encoder,
            categorical_columns: encoder.columns().to_vec(),
            defaults: encoder.defaults().to_vec(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Name of the selected registry candidate
    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn cv_scores(&self) -> &[CandidateScore] {
        &self.cv_scores
    }

    pub fn report(&self) -> &EvaluationReport {
        &self.report
    }

    pub fn class_counts(&self) -> &BTreeMap<String, usize> {
        &self.class_counts
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.label_encoder
    }

    pub fn categorical_columns(&self) -> &[CategoricalField] {
        &self.categorical_columns
    }

    pub fn defaults(&self) -> &[(CategoricalField, String)] {
        &self.defaults
    }

    /// Encoder identical to the one used at training time
    pub fn feature_encoder(&self) -> FeatureEncoder {
        FeatureEncoder::with_defaults(self.categorical_columns.clone(), self.defaults.clone())
    }

    /// Check internal consistency of a deserialized artifact
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ArtifactError::FormatVersion {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if self.label_encoder.len() != self.pipeline.n_classes() {
            return Err(ArtifactError::Inconsistent(format!(
                "{} labels for a {}-class model",
                self.label_encoder.len(),
                self.pipeline.n_classes()
            )));
        }
        if self.pipeline.preprocessor().columns() != self.categorical_columns.as_slice() {
            return Err(ArtifactError::Inconsistent(
                "categorical columns differ from the fitted preprocessor".to_string(),
            ));
        }
        if let Some(missing) = self
            .categorical_columns
            .iter()
            .find(|c| !self.defaults.iter().any(|(f, _)| f == *c))
        {
            return Err(ArtifactError::Inconsistent(format!("no default for column {}", missing)));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Atomically replace the artifact at `path`
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        let json = self.to_json()?;
        let io_error = |source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(io_error)?;
                parent
            }
            None => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(parent).map_err(io_error)?;
        temp.write_all(json.as_bytes()).map_err(io_error)?;
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(path).map_err(|e| io_error(e.error))?;

        info!("Saved model artifact ({}) to {}", self.candidate, path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let json = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_json(&json)?;
        info!(
            "Loaded model artifact ({}, trained {}) from {}",
            artifact.candidate,
            artifact.created_at.format("%Y-%m-%d %H:%M:%S"),
            path.display()
        );
        Ok(artifact)
    }
}
