//! Model Module - trained CLV model access
//!
//! Tách logic đọc model khỏi service.
//! Backends: XGBoost JSON (native), ONNX Runtime (feature `onnx`).

pub mod loader;
pub mod metadata;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod predictor;
pub mod xgboost;

// Re-export common types
pub use loader::{load, LoadOptions, LoadedModel};
pub use metadata::{ModelMetadata, SidecarMetadata};
pub use predictor::Predictor;
pub use xgboost::XgbRegressor;
