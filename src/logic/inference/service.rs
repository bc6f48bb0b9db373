//! CLV Inference Service
//!
//! record → feature row → predictor → log-space value → expm1 → currency.
//! Holds only the immutable predictor; nothing carries over between calls.

use std::time::Instant;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::transform::{inverse_log1p, NegativePolicy};
use crate::logic::config::ServiceConfig;
use crate::logic::error::{ClvResult, ModelLoadError, PredictionError};
use crate::logic::features::{FeatureRecord, FeatureTable};
use crate::logic::model::{self, ModelMetadata, Predictor};

// ============================================================================
// STATE
// ============================================================================

/// Process-wide service, initialised once
static SERVICE: OnceCell<ClvService> = OnceCell::new();

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Prediction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Expected lifetime value in currency units
    pub clv: f64,
    /// Raw model output, log1p space
    pub log_prediction: f64,
    /// True when a negative amount was replaced by 0.0
    pub clamped_negative: bool,
    pub backend: String,
    pub inference_time_us: u64,
}

pub struct ClvService {
    predictor: Box<dyn Predictor>,
    metadata: Option<ModelMetadata>,
    negative_policy: NegativePolicy,
}

impl std::fmt::Debug for ClvService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClvService")
            .field("backend", &self.predictor.backend())
            .field("metadata", &self.metadata)
            .field("negative_policy", &self.negative_policy)
            .finish()
    }
}

impl ClvService {
    /// Wrap an already constructed predictor
    pub fn new(predictor: Box<dyn Predictor>, negative_policy: NegativePolicy) -> Self {
        Self {
            predictor,
            metadata: None,
            negative_policy,
        }
    }

    /// Load the configured artifact. Fails for good on any load error.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ModelLoadError> {
        let loaded = model::load(&config.model_path, &config.load_options())?;
        Ok(Self {
            predictor: loaded.predictor,
            metadata: Some(loaded.metadata),
            negative_policy: config.negative_policy,
        })
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.metadata.as_ref()
    }

    pub fn negative_policy(&self) -> NegativePolicy {
        self.negative_policy
    }

    /// Predict the lifetime value of one customer
    pub fn predict(&self, record: &FeatureRecord) -> ClvResult<PredictionResult> {
        let vector = record.to_vector();
        let table = FeatureTable::single(&vector)?;

        let start_time = Instant::now();
        let outputs = self.predictor.predict(&table)?;
        let inference_time_us = start_time.elapsed().as_micros() as u64;

        let raw = match outputs.as_slice() {
            [raw] => f64::from(*raw),
            _ => {
                return Err(PredictionError::RowCountMismatch {
                    expected: 1,
                    actual: outputs.len(),
                }
                .into())
            }
        };
        if !raw.is_finite() {
            return Err(PredictionError::NonFinite { stage: "model output", value: raw }.into());
        }

        let amount = inverse_log1p(raw);
        if !amount.is_finite() {
            return Err(PredictionError::NonFinite { stage: "expm1", value: amount }.into());
        }

        let (clv, clamped_negative) = self.negative_policy.apply(amount);
        if clamped_negative {
            log::warn!(
                "Model produced negative CLV {:.4} (log prediction {:.6}); reporting 0.0",
                amount,
                raw
            );
        }

        log::debug!(
            "CLV prediction: {:.2} (raw {:.6}, {} us, {})",
            clv,
            raw,
            inference_time_us,
            vector.to_log_entry()
        );

        Ok(PredictionResult {
            clv,
            log_prediction: raw,
            clamped_negative,
            backend: self.predictor.backend().to_string(),
            inference_time_us,
        })
    }

    /// Predict from a loosely typed JSON record
    pub fn predict_json(&self, value: &serde_json::Value) -> ClvResult<PredictionResult> {
        let record = FeatureRecord::from_json(value)?;
        self.predict(&record)
    }

    pub fn predict_str(&self, input: &str) -> ClvResult<PredictionResult> {
        let record = FeatureRecord::from_json_str(input)?;
        self.predict(&record)
    }
}

// ============================================================================
// PROCESS-WIDE SERVICE
// ============================================================================

/// Initialise the process-wide service. Later calls return the same instance
/// and ignore `config`; a failed load leaves the cell empty.
pub fn init(config: &ServiceConfig) -> Result<&'static ClvService, ModelLoadError> {
    SERVICE.get_or_try_init(|| {
        let service = ClvService::from_config(config)?;
        log::info!("CLV inference service initialised");
        Ok(service)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::error::{ClvError, SchemaError};
    use crate::logic::features::{CustomerSegment, FEATURE_COUNT, FEATURE_LAYOUT};
    use crate::logic::inference::transform::forward_log1p;
    use crate::logic::model::predictor::testing::{
        BrokenPredictor, ConstantPredictor, LinearPredictor,
    };
    use crate::logic::model::xgboost::tests::stump_model_json;
    use serde_json::json;

    fn linear_service() -> ClvService {
        // Mild positive weights on frequency, order value and quantity
        ClvService::new(
            Box::new(LinearPredictor {
                intercept: 2.0,
                weights: vec![-0.001, 0.02, 0.1, 0.0004, 0.001, 0.0005],
            }),
            NegativePolicy::ClampToZero,
        )
    }

    fn boundary_record() -> FeatureRecord {
        FeatureRecord::new(0, 1, CustomerSegment::LowValue, 0.0, 0, 1)
    }

    #[test]
    fn test_inverse_transform_applied() {
        let service = ClvService::new(
            Box::new(ConstantPredictor(100.0_f32.ln_1p())),
            NegativePolicy::ClampToZero,
        );
        let result = service.predict(&FeatureRecord::default()).unwrap();
        assert!((result.clv - 100.0).abs() < 1e-3);
        assert!(!result.clamped_negative);
        assert_eq!(result.backend, "constant");
    }

    #[test]
    fn test_log_prediction_recoverable() {
        let service = linear_service();
        let result = service.predict(&FeatureRecord::default()).unwrap();
        assert!((forward_log1p(result.clv) - result.log_prediction).abs() < 1e-9);
    }

    #[test]
    fn test_valid_records_non_negative_and_finite() {
        let service = linear_service();
        for segment in CustomerSegment::ALL {
            for (recency, frequency, aov, days, qty) in [
                (0, 1, 0.0, 0, 1),
                (365, 100, 10_000.0, 365, 1000),
                (30, 5, 100.0, 60, 20),
                (365, 1, 0.0, 0, 1),
            ] {
                let record = FeatureRecord::new(recency, frequency, segment, aov, days, qty);
                let result = service.predict(&record).unwrap();
                assert!(result.clv.is_finite());
                assert!(result.clv >= 0.0);
            }
        }
    }

    #[test]
    fn test_boundary_record_is_defined() {
        let result = linear_service().predict(&boundary_record()).unwrap();
        assert!(result.clv >= 0.0);
    }

    #[test]
    fn test_deterministic() {
        let service = linear_service();
        let record = FeatureRecord::new(12, 9, CustomerSegment::HighValue, 250.75, 120, 48);
        let a = service.predict(&record).unwrap();
        let b = service.predict(&record).unwrap();
        assert_eq!(a.clv.to_bits(), b.clv.to_bits());
        assert_eq!(a.log_prediction.to_bits(), b.log_prediction.to_bits());
    }

    #[test]
    fn test_negative_prediction_clamped_by_default() {
        let service = ClvService::new(Box::new(ConstantPredictor(-0.5)), NegativePolicy::ClampToZero);
        let result = service.predict(&boundary_record()).unwrap();
        assert_eq!(result.clv, 0.0);
        assert!(result.clamped_negative);
        assert_eq!(result.log_prediction, -0.5);
    }

    #[test]
    fn test_negative_prediction_kept_when_configured() {
        let service = ClvService::new(Box::new(ConstantPredictor(-0.5)), NegativePolicy::Keep);
        let result = service.predict(&boundary_record()).unwrap();
        assert!((result.clv - (-0.5_f64).exp_m1()).abs() < 1e-12);
        assert!(!result.clamped_negative);
    }

    #[test]
    fn test_overflow_is_prediction_error() {
        let service = ClvService::new(Box::new(ConstantPredictor(1000.0)), NegativePolicy::ClampToZero);
        assert!(matches!(
            service.predict(&boundary_record()),
            Err(ClvError::Prediction(PredictionError::NonFinite { stage: "expm1", .. }))
        ));

        let service = ClvService::new(Box::new(ConstantPredictor(f32::NAN)), NegativePolicy::ClampToZero);
        assert!(matches!(
            service.predict(&boundary_record()),
            Err(ClvError::Prediction(PredictionError::NonFinite { stage: "model output", .. }))
        ));
    }

    #[test]
    fn test_backend_failure_surfaces_and_service_stays_usable() {
        let broken = ClvService::new(Box::new(BrokenPredictor::Fails), NegativePolicy::ClampToZero);
        let err = broken.predict(&boundary_record()).unwrap_err();
        assert_eq!(err.kind(), "PredictionError");
        assert!(err.to_string().contains("shape mismatch"));

        let empty = ClvService::new(Box::new(BrokenPredictor::NoRows), NegativePolicy::ClampToZero);
        assert!(matches!(
            empty.predict(&boundary_record()),
            Err(ClvError::Prediction(PredictionError::RowCountMismatch { expected: 1, actual: 0 }))
        ));

        // A failed request leaves nothing behind
        let service = linear_service();
        assert!(service.predict_json(&json!({})).is_err());
        assert!(service.predict(&boundary_record()).is_ok());
    }

    #[test]
    fn test_missing_field_is_schema_error() {
        let service = linear_service();
        let full = serde_json::to_value(FeatureRecord::default()).unwrap();

        for name in FEATURE_LAYOUT {
            let mut value = full.clone();
            value.as_object_mut().unwrap().remove(*name);
            match service.predict_json(&value) {
                Err(ClvError::Schema(SchemaError::MissingField(field))) => assert_eq!(field, *name),
                other => panic!("{}: expected SchemaError, got {:?}", name, other),
            }
        }
        assert!(service.predict_json(&full).is_ok());
    }

    #[test]
    fn test_predict_str() {
        let service = linear_service();
        let ok = service.predict_str(
            r#"{"Recency": 30, "Frequency": 5, "Cluster": 3, "AvgOrderValue": 100.0, "DaysActive": 60, "Quantity": 20}"#,
        );
        assert!(ok.is_ok());
        assert!(matches!(
            service.predict_str("not json"),
            Err(ClvError::Schema(SchemaError::InvalidJson(_)))
        ));
    }

    #[test]
    fn test_from_config_with_xgboost_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgb_clv_model.json");
        std::fs::write(&path, stump_model_json()).unwrap();

        let config = ServiceConfig {
            model_path: path,
            ..Default::default()
        };
        let service = ClvService::from_config(&config).unwrap();
        assert_eq!(service.metadata().unwrap().features, FEATURE_COUNT);

        // base 4.0 + recent (0.5) + cheap (0.0)
        let result = service.predict(&boundary_record()).unwrap();
        assert_eq!(result.log_prediction, 4.5);
        assert!((result.clv - 4.5_f64.exp_m1()).abs() < 1e-9);
        assert_eq!(result.backend, "xgboost-json");
    }

    #[test]
    fn test_from_config_missing_model_is_fatal() {
        let config = ServiceConfig {
            model_path: "does/not/exist.json".into(),
            ..Default::default()
        };
        assert!(matches!(
            ClvService::from_config(&config),
            Err(ModelLoadError::NotFound(_))
        ));
    }

    #[test]
    fn test_global_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgb_clv_model.json");
        std::fs::write(&path, stump_model_json()).unwrap();

        let bad = ServiceConfig {
            model_path: dir.path().join("missing.json"),
            ..Default::default()
        };
        let good = ServiceConfig {
            model_path: path,
            ..Default::default()
        };

        // Only this test touches the global cell
        assert!(init(&bad).is_err());
        assert!(SERVICE.get().is_none());

        let first = init(&good).unwrap();
        let second = init(&bad).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.metadata().map(|m| m.backend.as_str()), Some("xgboost-json"));
    }
}
