//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_CLAMP_NEGATIVE, DEFAULT_MODEL_PATH, ENV_CLAMP_NEGATIVE, ENV_MODEL_METADATA,
    ENV_MODEL_PATH, ENV_MODEL_SHA256,
};
use crate::logic::inference::transform::NegativePolicy;
use crate::logic::model::LoadOptions;

/// Service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Trained model artifact (.json or .onnx)
    pub model_path: PathBuf,

    /// Sidecar metadata; `None` means "next to the model, if present"
    pub metadata_path: Option<PathBuf>,

    /// Expected SHA-256 of the artifact
    pub expected_sha256: Option<String>,

    /// Negative prediction handling
    pub negative_policy: NegativePolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            metadata_path: None,
            expected_sha256: None,
            negative_policy: policy_from_flag(DEFAULT_CLAMP_NEGATIVE),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables (and `.env`, if present)
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let negative_policy = match get(ENV_CLAMP_NEGATIVE) {
            Some(raw) => match parse_flag(&raw) {
                Some(flag) => policy_from_flag(flag),
                None => {
                    log::warn!(
                        "{}='{}' is not a boolean, using default ({})",
                        ENV_CLAMP_NEGATIVE,
                        raw,
                        DEFAULT_CLAMP_NEGATIVE
                    );
                    policy_from_flag(DEFAULT_CLAMP_NEGATIVE)
                }
            },
            None => policy_from_flag(DEFAULT_CLAMP_NEGATIVE),
        };

        Self {
            model_path: get(ENV_MODEL_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            metadata_path: get(ENV_MODEL_METADATA).map(PathBuf::from),
            expected_sha256: get(ENV_MODEL_SHA256),
            negative_policy,
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            expected_sha256: self.expected_sha256.clone(),
            metadata_path: self.metadata_path.clone(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn policy_from_flag(clamp: bool) -> NegativePolicy {
    if clamp {
        NegativePolicy::ClampToZero
    } else {
        NegativePolicy::Keep
    }
}
