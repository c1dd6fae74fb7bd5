//! fivewhy-ml - root cause classification pipeline
//!
//! Turns a free-text issue plus categorical context into a predicted root
//! cause with a confidence score.
//!
//! - [`encoder`]: record → (text blob, defaulted categorical values)
//! - [`preprocess`]: TF-IDF text features + one-hot categorical features
//! - [`smote`]: synthetic minority oversampling
//! - [`models`]: candidate classifiers
//! - [`trainer`]: stratified split, cross-validated model selection
//! - [`artifact`]: the persisted, immutable trained model
//! - [`inference`]: thresholded prediction against a loaded artifact

pub mod artifact;
pub mod categorical;
pub mod encoder;
pub mod import;
pub mod inference;
pub mod labels;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod smote;
pub mod split;
pub mod text;
pub mod trainer;

pub use artifact::{ArtifactError, TrainedModelArtifact};
pub use encoder::{CaseDescription, EncodedRecord, FeatureEncoder, FeatureSource};
pub use inference::{
    InferenceEngine, InferenceError, LabelConfidence, PredictionResult, DEFAULT_THRESHOLD,
    NEEDS_REVIEW_LABEL,
};
pub use preprocess::FeatureError;
pub use trainer::{Trainer, TrainingConfig, TrainingError};
