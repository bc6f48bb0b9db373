//! Inference Module - CLV prediction service

pub mod service;
pub mod transform;

pub use service::{init, ClvService, PredictionResult};
pub use transform::NegativePolicy;
