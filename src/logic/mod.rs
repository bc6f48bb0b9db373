//! Logic Module - Business Logic & Engines
//!
//! ## Architecture
//! - `features/` - Feature schema, segment labels, record assembly
//! - `model/` - Artifact loading and predictor backends (XGBoost JSON, ONNX)
//! - `inference/` - The CLV service and the log1p target transform

pub mod config;
pub mod error;
pub mod features;
pub mod inference;
pub mod model;
