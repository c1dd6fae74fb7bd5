//! Shared preprocessing stage: TF-IDF text block followed by one-hot block
//!
//! The output matrix has `text.n_features() + one_hot.n_features()` columns.
//! The preprocessor is always fitted on the training rows of the current fit
//! (each CV fold refits its own), never on validation rows.

use fivewhy_common::CategoricalField;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::categorical::OneHotEncoder;
use crate::encoder::EncodedRecord;
use crate::text::{TfidfConfig, TfidfVectorizer};

/// Failure while turning encoded records into a feature matrix
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("no samples to fit the preprocessor on")]
    EmptyInput,

    #[error("categorical columns {found:?} do not match fitted columns {expected:?}")]
    ColumnMismatch {
        expected: Vec<CategoricalField>,
        found: Vec<CategoricalField>,
    },

    #[error("feature vector has {found} columns, model expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("non-finite feature value in column {column}")]
    NonFinite { column: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    columns: Vec<CategoricalField>,
    text: TfidfVectorizer,
    one_hot: OneHotEncoder,
}

impl Preprocessor {
    pub fn fit(config: &TfidfConfig, samples: &[EncodedRecord]) -> Result<Self, FeatureError> {
        let first = samples.first().ok_or(FeatureError::EmptyInput)?;
        let columns: Vec<CategoricalField> = first.categorical.iter().map(|(f, _)| *f).collect();

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(samples.len());
        for sample in samples {
            rows.push(categorical_row(&columns, sample)?);
        }

        let documents: Vec<&str> = samples.iter().map(|s| s.text.as_str()).collect();
        let text = TfidfVectorizer::fit(config, &documents);
        let one_hot = OneHotEncoder::fit(columns.len(), rows.iter().map(Vec::as_slice));

        debug!(
            "Preprocessor fitted: {} text features, {} categorical features",
            text.n_features(),
            one_hot.n_features()
        );

        Ok(Self {
            columns,
            text,
            one_hot,
        })
    }

    pub fn columns(&self) -> &[CategoricalField] {
        &self.columns
    }

    pub fn n_features(&self) -> usize {
        self.text.n_features() + self.one_hot.n_features()
    }

    pub fn text(&self) -> &TfidfVectorizer {
        &self.text
    }

    pub fn transform(&self, samples: &[EncodedRecord]) -> Result<Array2<f64>, FeatureError> {
        let width = self.n_features();
        let text_width = self.text.n_features();
        let mut matrix = Array2::<f64>::zeros((samples.len(), width));

        for (i, sample) in samples.iter().enumerate() {
            let row = categorical_row(&self.columns, sample)?;
            let mut buffer = vec![0.0; width];
            let (text_part, one_hot_part) = buffer.split_at_mut(text_width);
            self.text.transform_into(&sample.text, text_part);
            let unknown = self.one_hot.transform_into(&row, one_hot_part);
            if unknown > 0 {
                debug!("{} unseen categorical value(s) encoded as zeros", unknown);
            }

            if let Some(column) = buffer.iter().position(|v| !v.is_finite()) {
                return Err(FeatureError::NonFinite { column });
            }
            for (j, value) in buffer.into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }

        Ok(matrix)
    }
}

fn categorical_row(
    columns: &[CategoricalField],
    sample: &EncodedRecord,
) -> Result<Vec<String>, FeatureError> {
    let found: Vec<CategoricalField> = sample.categorical.iter().map(|(f, _)| *f).collect();
    if found != columns {
        return Err(FeatureError::ColumnMismatch {
            expected: columns.to_vec(),
            found,
        });
    }
    Ok(sample.categorical.iter().map(|(_, v)| v.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{CaseDescription, FeatureEncoder};

    fn config() -> TfidfConfig {
        TfidfConfig {
            min_df: 0.0,
            max_df: 1.0,
            ngram_range: (1, 1),
            ..Default::default()
        }
    }

    fn samples() -> Vec<EncodedRecord> {
        let encoder = FeatureEncoder::new(vec![CategoricalField::ShiftTime]);
        vec![
            encoder.encode(&CaseDescription::new("pump leak").with(CategoricalField::ShiftTime, "night")),
            encoder.encode(&CaseDescription::new("valve noise")),
        ]
    }

    #[test]
    fn test_fit_requires_samples() {
        assert_eq!(Preprocessor::fit(&config(), &[]), Err(FeatureError::EmptyInput));
    }

    #[test]
    fn test_transform_shape() {
        let samples = samples();
        let pre = Preprocessor::fit(&config(), &samples).unwrap();
        // leak, noise, pump, valve + day, night
        assert_eq!(pre.n_features(), 6);

        let matrix = pre.transform(&samples).unwrap();
        assert_eq!(matrix.dim(), (2, 6));
        assert_eq!(matrix[[0, 5]], 1.0);
        assert_eq!(matrix[[1, 4]], 1.0);
    }

    #[test]
    fn test_column_mismatch_is_error() {
        let pre = Preprocessor::fit(&config(), &samples()).unwrap();
        let other = FeatureEncoder::new(vec![CategoricalField::Environment])
            .encode(&CaseDescription::new("pump"));

        assert!(matches!(
            pre.transform(&[other]),
            Err(FeatureError::ColumnMismatch { .. })
        ));
    }
}
