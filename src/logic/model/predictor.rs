//! Predictor - single-capability model interface
//!
//! The service only ever asks a model one thing: score these rows.
//! Swapping model family or serialization means adding an implementor here,
//! nothing in `inference/` changes.

use crate::logic::error::PredictionError;
use crate::logic::features::FeatureTable;

pub trait Predictor: Send + Sync {
    /// One raw (log-space) value per table row
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f32>, PredictionError>;

    /// Short backend name for logs and results
    fn backend(&self) -> &'static str;

    /// Number of input columns the artifact was trained with, if it records it
    fn expected_features(&self) -> Option<usize> {
        None
    }

    /// Ordered column names stored in the artifact, if any
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}
