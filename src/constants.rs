//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.

/// Default model artifact, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "models/xgb_clv_model.json";

/// Clamp negative predictions to zero unless told otherwise
pub const DEFAULT_CLAMP_NEGATIVE: bool = true;

/// Currency symbol used by the form display
pub const CURRENCY_SYMBOL: &str = "$";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "CLV Predictor";

// ============================================
// Environment variable names
// ============================================

pub const ENV_MODEL_PATH: &str = "CLV_MODEL_PATH";
pub const ENV_MODEL_METADATA: &str = "CLV_MODEL_METADATA";
pub const ENV_MODEL_SHA256: &str = "CLV_MODEL_SHA256";
pub const ENV_CLAMP_NEGATIVE: &str = "CLV_CLAMP_NEGATIVE";
