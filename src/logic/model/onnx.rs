//! ONNX Predictor - ONNX Runtime Integration
//!
//! For CLV models exported with onnxmltools / skl2onnx. Expects a single float
//! input of shape `[N, FEATURE_COUNT]` and reads the first output, one value
//! per row (`[N]` or `[N, 1]`).

use std::path::Path;

use parking_lot::Mutex;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{Value, ValueType};

use super::predictor::Predictor;
use crate::logic::error::{ModelLoadError, PredictionError};
use crate::logic::features::FeatureTable;

pub struct OnnxPredictor {
    /// `Session::run` needs `&mut`, the predictor is shared
    session: Mutex<Session>,
    output_name: String,
    expected_features: Option<usize>,
}

impl OnnxPredictor {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        log::info!("Loading ONNX model from: {}", path.display());

        let session = Session::builder()
            .map_err(|e| ModelLoadError::Backend(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelLoadError::Backend(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| ModelLoadError::Corrupt(format!("Failed to load model: {}", e)))?;

        if session.inputs.len() != 1 {
            return Err(ModelLoadError::SchemaMismatch(format!(
                "expected 1 model input, found {}",
                session.inputs.len()
            )));
        }

        let expected_features = match &session.inputs[0].input_type {
            ValueType::Tensor { shape, .. } => feature_width(shape),
            other => {
                return Err(ModelLoadError::SchemaMismatch(format!(
                    "model input must be a tensor, found {:?}",
                    other
                )));
            }
        };
        if expected_features.is_none() {
            log::warn!("ONNX input width is dynamic, feature count checked per request");
        }

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelLoadError::Corrupt("No output defined".to_string()))?;

        log::info!("ONNX model loaded successfully (output: {})", output_name);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            expected_features,
        })
    }
}

/// Feature width of a `[N, F]` input shape; `None` when the last dim is dynamic (`-1`)
fn feature_width(dims: &[i64]) -> Option<usize> {
    if dims.len() < 2 {
        return None;
    }
    dims.last()
        .and_then(|&width| usize::try_from(width).ok())
        .filter(|&width| width > 0)
}

impl Predictor for OnnxPredictor {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f32>, PredictionError> {
        let rows = table.n_rows();

        let input_tensor = Value::from_array(table.data().clone())
            .map_err(|e| PredictionError::Shape(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| PredictionError::Backend(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| PredictionError::Backend("No output".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PredictionError::Backend(format!("Extract error: {}", e)))?;

        if data.len() != rows {
            return Err(PredictionError::RowCountMismatch {
                expected: rows,
                actual: data.len(),
            });
        }

        Ok(data.to_vec())
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }

    fn expected_features(&self) -> Option<usize> {
        self.expected_features
    }
}
