//! Feature Record - typed customer attributes
//!
//! A record is built explicitly per request, either from typed values (the
//! form) or from a loosely typed JSON object. Fields are looked up by the
//! names in `FEATURE_LAYOUT`; the key order of the incoming object is ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::layout::{
    FEATURE_COUNT, FEATURE_DOMAINS, FEATURE_LAYOUT, IDX_AVG_ORDER_VALUE, IDX_CLUSTER, IDX_DAYS_ACTIVE, IDX_FREQUENCY,
    IDX_QUANTITY, IDX_RECENCY,
};
use super::segment::CustomerSegment;
use super::vector::FeatureVector;
use crate::logic::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "Recency")]
    pub recency: u32,
    #[serde(rename = "Frequency")]
    pub frequency: u32,
    #[serde(rename = "Cluster")]
    pub cluster: CustomerSegment,
    #[serde(rename = "AvgOrderValue")]
    pub avg_order_value: f64,
    #[serde(rename = "DaysActive")]
    pub days_active: u32,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
}

impl FeatureRecord {
    pub fn new(
        recency: u32,
        frequency: u32,
        cluster: CustomerSegment,
        avg_order_value: f64,
        days_active: u32,
        quantity: u32,
    ) -> Self {
        Self {
            recency,
            frequency,
            cluster,
            avg_order_value,
            days_active,
            quantity,
        }
    }

    /// Parse a JSON document (object) into a record
    pub fn from_json_str(input: &str) -> Result<Self, SchemaError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Build a record from a loosely typed JSON value.
    ///
    /// Every layout field must be present and numeric. Nothing is defaulted.
    /// Whole numbers outside the 32-bit count range saturate.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let row = read_row(value)?;
        Ok(Self::from_row(&row, segment_from_id(row[IDX_CLUSTER])?))
    }

    /// Like [`FeatureRecord::from_json`], but clamps every numeric field into
    /// its domain before typing it, the way the form widgets would. A negative
    /// day count becomes `0`. Segment ids are never clamped.
    pub fn from_form_json(value: &Value) -> Result<Self, SchemaError> {
        let mut row = read_row(value)?;
        clamp_row(&mut row);
        Ok(Self::from_row(&row, segment_from_id(row[IDX_CLUSTER])?))
    }

    /// Clamp every field into its declared domain.
    ///
    /// This is the only validation the system performs, and it belongs to the
    /// form layer; the service itself never calls it.
    pub fn clamped(&self) -> Self {
        let mut row = self.to_row();
        clamp_row(&mut row);
        Self::from_row(&row, self.cluster)
    }

    /// True when every field is inside its declared domain
    pub fn in_domain(&self) -> bool {
        self.to_row()
            .iter()
            .zip(FEATURE_DOMAINS.iter())
            .all(|(value, domain)| domain.contains(*value))
    }

    /// Lay the record out in model column order
    pub fn to_vector(&self) -> FeatureVector {
        let mut vector = FeatureVector::new();
        vector.set(IDX_RECENCY, self.recency as f32);
        vector.set(IDX_FREQUENCY, self.frequency as f32);
        vector.set(IDX_CLUSTER, self.cluster.id() as f32);
        vector.set(IDX_AVG_ORDER_VALUE, self.avg_order_value as f32);
        vector.set(IDX_DAYS_ACTIVE, self.days_active as f32);
        vector.set(IDX_QUANTITY, self.quantity as f32);
        vector
    }

    fn to_row(&self) -> [f64; FEATURE_COUNT] {
        let mut row = [0.0; FEATURE_COUNT];
        row[IDX_RECENCY] = self.recency as f64;
        row[IDX_FREQUENCY] = self.frequency as f64;
        row[IDX_CLUSTER] = self.cluster.id() as f64;
        row[IDX_AVG_ORDER_VALUE] = self.avg_order_value;
        row[IDX_DAYS_ACTIVE] = self.days_active as f64;
        row[IDX_QUANTITY] = self.quantity as f64;
        row
    }

    fn from_row(row: &[f64; FEATURE_COUNT], cluster: CustomerSegment) -> Self {
        Self {
            recency: count_at(row, IDX_RECENCY),
            frequency: count_at(row, IDX_FREQUENCY),
            cluster,
            avg_order_value: row[IDX_AVG_ORDER_VALUE],
            days_active: count_at(row, IDX_DAYS_ACTIVE),
            quantity: count_at(row, IDX_QUANTITY),
        }
    }
}

impl Default for FeatureRecord {
    /// Form defaults shown before the user edits anything
    fn default() -> Self {
        Self::new(30, 5, CustomerSegment::LowValue, 100.0, 60, 20)
    }
}

// ============================================================================
// FIELD EXTRACTION
// ============================================================================

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn field<'a>(map: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, SchemaError> {
    match map.get(name) {
        None | Some(Value::Null) => Err(SchemaError::MissingField(name)),
        Some(value) => Ok(value),
    }
}

fn wrong_type(name: &'static str, expected: &'static str, value: &Value) -> SchemaError {
    SchemaError::WrongType {
        field: name,
        expected,
        found: value.to_string(),
    }
}

/// Whole numbers are accepted in either JSON integer or float notation (`5`, `5.0`, `-5`)
fn integer_field(map: &Map<String, Value>, name: &'static str) -> Result<f64, SchemaError> {
    let value = field(map, name)?;
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .ok_or_else(|| wrong_type(name, "a whole number", value))
}

fn float_field(map: &Map<String, Value>, name: &'static str) -> Result<f64, SchemaError> {
    let value = field(map, name)?;
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| wrong_type(name, "a finite number", value))
}

/// Every layout field as a number, in column order
fn read_row(value: &Value) -> Result<[f64; FEATURE_COUNT], SchemaError> {
    let map = value
        .as_object()
        .ok_or_else(|| SchemaError::NotAnObject(json_type_name(value)))?;

    let mut row = [0.0; FEATURE_COUNT];
    for (idx, name) in FEATURE_LAYOUT.iter().copied().enumerate() {
        row[idx] = if FEATURE_DOMAINS[idx].integer {
            integer_field(map, name)?
        } else {
            float_field(map, name)?
        };
    }
    Ok(row)
}

fn segment_from_id(value: f64) -> Result<CustomerSegment, SchemaError> {
    let id = value as i64;
    u8::try_from(id)
        .ok()
        .and_then(CustomerSegment::from_id)
        .ok_or(SchemaError::UnknownSegment(id))
}

// Segment ids are looked up, not clamped
fn clamp_row(row: &mut [f64; FEATURE_COUNT]) {
    for (idx, value) in row.iter_mut().enumerate() {
        if idx == IDX_CLUSTER {
            continue;
        }
        let domain = FEATURE_DOMAINS[idx];
        let clamped = if value.is_nan() {
            domain.min
        } else {
            domain.clamp(*value)
        };
        if clamped != *value {
            log::warn!(
                "{} = {} outside domain, clamped to {}",
                FEATURE_LAYOUT[idx],
                value,
                clamped
            );
            *value = clamped;
        }
    }
}

/// `as` saturates, so out-of-range counts land on 0 or u32::MAX
fn count_at(row: &[f64; FEATURE_COUNT], idx: usize) -> u32 {
    let count = row[idx] as u32;
    if count as f64 != row[idx] {
        log::warn!(
            "{} = {} does not fit a 32-bit count, saturated to {}",
            FEATURE_LAYOUT[idx],
            row[idx],
            count
        );
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Value {
        json!({
            "Recency": 30,
            "Frequency": 5,
            "Cluster": 2,
            "AvgOrderValue": 100.5,
            "DaysActive": 60,
            "Quantity": 20
        })
    }

    #[test]
    fn test_from_json_full_record() {
        let record = FeatureRecord::from_json(&full_record()).unwrap();
        assert_eq!(record.recency, 30);
        assert_eq!(record.frequency, 5);
        assert_eq!(record.cluster, CustomerSegment::HighValue);
        assert_eq!(record.avg_order_value, 100.5);
        assert_eq!(record.days_active, 60);
        assert_eq!(record.quantity, 20);
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        let shuffled = json!({
            "Quantity": 20,
            "DaysActive": 60,
            "AvgOrderValue": 100.5,
            "Cluster": 2,
            "Frequency": 5,
            "Recency": 30
        });
        assert_eq!(
            FeatureRecord::from_json(&shuffled).unwrap(),
            FeatureRecord::from_json(&full_record()).unwrap()
        );
    }

    #[test]
    fn test_each_missing_field_is_reported() {
        for name in FEATURE_LAYOUT {
            let mut value = full_record();
            value.as_object_mut().unwrap().remove(*name);

            match FeatureRecord::from_json(&value) {
                Err(SchemaError::MissingField(field)) => assert_eq!(field, *name),
                other => panic!("expected MissingField({}), got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut value = full_record();
        value["Frequency"] = Value::Null;
        assert!(matches!(
            FeatureRecord::from_json(&value),
            Err(SchemaError::MissingField("Frequency"))
        ));
    }

    #[test]
    fn test_non_numeric_field_rejected() {
        let mut value = full_record();
        value["Quantity"] = json!("twenty");
        assert!(matches!(
            FeatureRecord::from_json(&value),
            Err(SchemaError::WrongType { field: "Quantity", .. })
        ));

        let mut value = full_record();
        value["AvgOrderValue"] = json!(true);
        assert!(matches!(
            FeatureRecord::from_json(&value),
            Err(SchemaError::WrongType { field: "AvgOrderValue", .. })
        ));
    }

    #[test]
    fn test_fractional_integer_rejected() {
        let mut value = full_record();
        value["Recency"] = json!(3.5);
        assert!(matches!(
            FeatureRecord::from_json(&value),
            Err(SchemaError::WrongType { field: "Recency", .. })
        ));

        value["Recency"] = json!(3.0);
        assert_eq!(FeatureRecord::from_json(&value).unwrap().recency, 3);
    }

    #[test]
    fn test_unknown_cluster_rejected() {
        let mut value = full_record();
        value["Cluster"] = json!(7);
        assert!(matches!(
            FeatureRecord::from_json(&value),
            Err(SchemaError::UnknownSegment(7))
        ));
    }

    #[test]
    fn test_negative_and_oversized_counts_are_numeric() {
        let mut value = full_record();
        value["Recency"] = json!(-5);
        value["Quantity"] = json!(5_000_000_000_u64);

        let record = FeatureRecord::from_json(&value).unwrap();
        assert_eq!(record.recency, 0);
        assert_eq!(record.quantity, u32::MAX);

        let record = FeatureRecord::from_form_json(&value).unwrap();
        assert_eq!(record.recency, 0);
        assert_eq!(record.quantity, 1000);
        assert!(record.in_domain());
    }

    #[test]
    fn test_form_json_clamps_every_numeric_field() {
        let value = json!({
            "Recency": 9000,
            "Frequency": 0,
            "Cluster": 3,
            "AvgOrderValue": -5.0,
            "DaysActive": -1.0,
            "Quantity": 20
        });
        let record = FeatureRecord::from_form_json(&value).unwrap();
        assert_eq!(
            record,
            FeatureRecord::new(365, 1, CustomerSegment::PotentialLoyalist, 0.0, 0, 20)
        );
    }

    #[test]
    fn test_form_json_does_not_clamp_segment() {
        let mut value = full_record();
        value["Cluster"] = json!(-1);
        assert!(matches!(
            FeatureRecord::from_form_json(&value),
            Err(SchemaError::UnknownSegment(-1))
        ));

        value["Cluster"] = json!(4.5);
        assert!(matches!(
            FeatureRecord::from_form_json(&value),
            Err(SchemaError::WrongType { field: "Cluster", .. })
        ));
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(
            FeatureRecord::from_json(&json!([1, 2, 3])),
            Err(SchemaError::NotAnObject("an array"))
        ));
        assert!(matches!(
            FeatureRecord::from_json_str("{not json"),
            Err(SchemaError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_to_vector_uses_layout_order() {
        let record = FeatureRecord::new(10, 2, CustomerSegment::PotentialLoyalist, 55.5, 40, 7);
        let vector = record.to_vector();
        assert_eq!(vector.as_slice(), &[10.0, 2.0, 3.0, 55.5, 40.0, 7.0]);
        assert_eq!(vector.get_by_name("Quantity"), Some(7.0));
    }

    #[test]
    fn test_clamped() {
        let record = FeatureRecord::new(400, 0, CustomerSegment::LowValue, 25_000.0, 500, 5000);
        assert!(!record.in_domain());

        let clamped = record.clamped();
        assert_eq!(clamped.recency, 365);
        assert_eq!(clamped.frequency, 1);
        assert_eq!(clamped.avg_order_value, 10_000.0);
        assert_eq!(clamped.days_active, 365);
        assert_eq!(clamped.quantity, 1000);
        assert!(clamped.in_domain());
    }

    #[test]
    fn test_clamped_keeps_valid_record() {
        let record = FeatureRecord::default();
        assert!(record.in_domain());
        assert_eq!(record.clamped(), record);
    }

    #[test]
    fn test_serde_uses_schema_names() {
        let record = FeatureRecord::default();
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["AvgOrderValue"], json!(100.0));
        assert_eq!(value["Cluster"], json!(0));
        assert_eq!(FeatureRecord::from_json(&value).unwrap(), record);
    }
}
