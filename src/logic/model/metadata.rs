//! Model Metadata
//!
//! `ModelMetadata` describes what was loaded. `SidecarMetadata` is the optional
//! JSON file the training pipeline writes next to the artifact
//! (`xgb_clv_model.json` → `xgb_clv_model.meta.json`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logic::error::ModelLoadError;
use crate::logic::features::layout::{self, FEATURE_VERSION};

/// Target transform the training pipeline applied
pub const TARGET_TRANSFORM_LOG1P: &str = "log1p";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub backend: String,
    pub features: usize,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub sha256: Option<String>,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SidecarMetadata {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_version: Option<u8>,
    #[serde(default)]
    pub layout_hash: Option<u32>,
    #[serde(default)]
    pub target_transform: Option<String>,
    #[serde(default)]
    pub trained_at: Option<String>,
}

impl SidecarMetadata {
    /// `<dir>/<stem>.meta.json`
    pub fn default_path(model_path: &Path) -> PathBuf {
        let stem = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        model_path.with_file_name(format!("{}.meta.json", stem))
    }

    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ModelLoadError::Corrupt(format!("metadata {}: {}", path.display(), e))
        })
    }

    /// Check the sidecar describes the schema this build feeds the model
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if !self.feature_names.is_empty() {
            if let Some(pos) = layout::first_name_mismatch(&self.feature_names) {
                return Err(ModelLoadError::SchemaMismatch(format!(
                    "metadata feature_names {:?} differ from layout {:?} at position {}",
                    self.feature_names,
                    layout::FEATURE_LAYOUT,
                    pos
                )));
            }
        }

        if self.feature_version.is_some() || self.layout_hash.is_some() {
            let version = self.feature_version.unwrap_or(FEATURE_VERSION);
            let hash = self.layout_hash.unwrap_or_else(layout::layout_hash);
            layout::validate_layout(version, hash)
                .map_err(|e| ModelLoadError::SchemaMismatch(e.to_string()))?;
        }

        match self.target_transform.as_deref() {
            None | Some(TARGET_TRANSFORM_LOG1P) => Ok(()),
            Some(other) => Err(ModelLoadError::SchemaMismatch(format!(
                "model was trained on '{}' targets, expected '{}'",
                other, TARGET_TRANSFORM_LOG1P
            ))),
        }
    }
}
