//! Model Loader - artifact → Predictor
//!
//! Steps: existence check, optional SHA-256 verification, format dispatch by
//! extension, schema validation against `FEATURE_LAYOUT`. Any failure here is
//! a `ModelLoadError` and is never retried.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::metadata::{ModelMetadata, SidecarMetadata};
use super::predictor::Predictor;
use super::xgboost::XgbRegressor;
use crate::logic::error::ModelLoadError;
use crate::logic::features::layout::{self, FEATURE_COUNT, FEATURE_VERSION};

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Expected lowercase hex SHA-256 of the artifact
    pub expected_sha256: Option<String>,
    /// Sidecar path; when unset `<stem>.meta.json` is used if it exists
    pub metadata_path: Option<PathBuf>,
}

pub struct LoadedModel {
    pub predictor: Box<dyn Predictor>,
    pub metadata: ModelMetadata,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("backend", &self.predictor.backend())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// SHA-256 of a file as lowercase hex
pub fn file_sha256(path: &Path) -> Result<String, ModelLoadError> {
    let bytes = std::fs::read(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

pub fn verify_checksum(path: &Path, expected: &str) -> Result<String, ModelLoadError> {
    let actual = file_sha256(path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(ModelLoadError::ChecksumMismatch {
            expected: expected.trim().to_lowercase(),
            actual,
        });
    }
    log::debug!("Model checksum verified: {}", actual);
    Ok(actual)
}

fn open_predictor(path: &Path) -> Result<Box<dyn Predictor>, ModelLoadError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => Ok(Box::new(XgbRegressor::load(path)?)),
        #[cfg(feature = "onnx")]
        "onnx" => Ok(Box::new(super::onnx::OnnxPredictor::load(path)?)),
        #[cfg(not(feature = "onnx"))]
        "onnx" => Err(ModelLoadError::UnsupportedFormat(
            "ONNX support not compiled in (enable the `onnx` feature)".to_string(),
        )),
        other => Err(ModelLoadError::UnsupportedFormat(format!(
            "'.{}' ({}); expected .json (XGBoost) or .onnx",
            other,
            path.display()
        ))),
    }
}

/// Reject predictors whose recorded schema differs from the layout
pub fn validate_schema(predictor: &dyn Predictor) -> Result<(), ModelLoadError> {
    if let Some(expected) = predictor.expected_features() {
        if expected != FEATURE_COUNT {
            return Err(ModelLoadError::SchemaMismatch(format!(
                "model expects {} features, layout v{} has {}",
                expected, FEATURE_VERSION, FEATURE_COUNT
            )));
        }
    }

    if let Some(names) = predictor.feature_names() {
        if let Some(pos) = layout::first_name_mismatch(names) {
            return Err(ModelLoadError::SchemaMismatch(format!(
                "model feature_names {:?} differ from layout {:?} at position {}",
                names,
                layout::FEATURE_LAYOUT,
                pos
            )));
        }
    }

    Ok(())
}

pub fn load(path: &Path, options: &LoadOptions) -> Result<LoadedModel, ModelLoadError> {
    log::info!("Loading CLV model from: {}", path.display());

    if !path.is_file() {
        return Err(ModelLoadError::NotFound(path.to_path_buf()));
    }

    let sha256 = match options.expected_sha256.as_deref() {
        Some(expected) => Some(verify_checksum(path, expected)?),
        None => None,
    };

    let predictor = open_predictor(path)?;
    validate_schema(predictor.as_ref())?;

    let sidecar_path = match &options.metadata_path {
        Some(explicit) => {
            if !explicit.is_file() {
                return Err(ModelLoadError::NotFound(explicit.clone()));
            }
            Some(explicit.clone())
        }
        None => Some(SidecarMetadata::default_path(path)).filter(|p| p.is_file()),
    };
    if let Some(sidecar_path) = sidecar_path {
        SidecarMetadata::load(&sidecar_path)?.validate()?;
        log::info!("Model metadata validated: {}", sidecar_path.display());
    } else if predictor.feature_names().is_none() {
        log::warn!(
            "Model {} records no feature names and has no metadata; column order is unchecked",
            path.display()
        );
    }

    let metadata = ModelMetadata {
        model_path: path.display().to_string(),
        backend: predictor.backend().to_string(),
        features: FEATURE_COUNT,
        feature_version: FEATURE_VERSION,
        layout_hash: layout::layout_hash(),
        sha256,
        loaded_at: chrono::Utc::now(),
    };

    log::info!(
        "CLV model ready (backend: {}, layout v{} {:08x})",
        metadata.backend,
        metadata.feature_version,
        metadata.layout_hash
    );

    Ok(LoadedModel { predictor, metadata })
}
