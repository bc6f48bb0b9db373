//! Form commands
//!
//! What a form front-end calls: field descriptions, segment options, and a
//! predict command returning either a formatted amount or a failure message.
//! There is no fallback value on failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::format::format_currency;
use crate::logic::error::{ClvError, SchemaError};
use crate::logic::features::layout::{FEATURE_DOMAINS, FEATURE_LAYOUT};
use crate::logic::features::{FeatureRecord, SEGMENT_LABELS};
use crate::logic::inference::ClvService;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub integer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentOption {
    pub id: u8,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClvResponse {
    pub clv: f64,
    pub display: String,
    pub log_prediction: f64,
    pub clamped_negative: bool,
}

// ============================================================================
// COMMANDS
// ============================================================================

fn field_label(name: &str) -> &'static str {
    match name {
        "Recency" => "Recency (days since last purchase)",
        "Frequency" => "Frequency (number of purchases)",
        "Cluster" => "Customer Segment",
        "AvgOrderValue" => "Average Order Value",
        "DaysActive" => "Days Active (range between first and last purchase)",
        "Quantity" => "Total Quantity Purchased",
        _ => "",
    }
}

/// Input fields in layout order, with domains and form defaults
pub fn get_form_fields() -> Vec<FormField> {
    let defaults = FeatureRecord::default().to_vector();
    FEATURE_LAYOUT
        .iter()
        .zip(FEATURE_DOMAINS.iter())
        .zip(defaults.as_slice().iter())
        .map(|((name, domain), default)| FormField {
            name: name.to_string(),
            label: field_label(name).to_string(),
            min: domain.min,
            max: domain.max,
            default: *default as f64,
            integer: domain.integer,
        })
        .collect()
}

pub fn get_segment_options() -> Vec<SegmentOption> {
    SEGMENT_LABELS
        .iter()
        .map(|(label, segment)| SegmentOption {
            id: segment.id(),
            label: label.to_string(),
        })
        .collect()
}

/// Score one form submission. Out-of-range numbers are clamped the way the
/// form widgets would; missing or non-numeric fields are an error.
pub fn predict_clv(service: &ClvService, input: &Value) -> Result<ClvResponse, String> {
    report(score(service, input))
}

/// Same as [`predict_clv`] for raw JSON text; malformed JSON is a `SchemaError`.
pub fn predict_clv_str(service: &ClvService, input: &str) -> Result<ClvResponse, String> {
    let parsed = serde_json::from_str::<Value>(input)
        .map_err(|e| ClvError::from(SchemaError::InvalidJson(e.to_string())));
    report(parsed.and_then(|value| score(service, &value)))
}

fn score(service: &ClvService, input: &Value) -> Result<ClvResponse, ClvError> {
    let record = FeatureRecord::from_form_json(input)?;
    let result = service.predict(&record)?;
    Ok(ClvResponse {
        clv: result.clv,
        display: format_currency(result.clv),
        log_prediction: result.log_prediction,
        clamped_negative: result.clamped_negative,
    })
}

fn report(result: Result<ClvResponse, ClvError>) -> Result<ClvResponse, String> {
    result.map_err(|e| {
        log::error!("CLV prediction failed: {}", e);
        format!("Prediction failed ({}): {}", e.kind(), e)
    })
}
