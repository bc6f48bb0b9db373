//! CLV Predictor - Customer Lifetime Value inference
//!
//! Loads a trained regression model once, turns six customer attributes into
//! a model row and maps the log-space prediction back to currency.

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::config::ServiceConfig;
pub use logic::error::{ClvError, ClvResult, ModelLoadError, PredictionError, SchemaError};
pub use logic::features::{CustomerSegment, FeatureRecord};
pub use logic::inference::{ClvService, NegativePolicy, PredictionResult};
pub use logic::model::Predictor;
