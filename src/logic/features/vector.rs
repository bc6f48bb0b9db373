//! Feature Vector - Core data structure for ML input
//!
//! **Versioned feature vector with layout validation**
//!
//! `FeatureVector` is one row in `FEATURE_LAYOUT` order. `FeatureTable` is the
//! named-column 2-D table handed to a `Predictor`.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::layout::{
    layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT,
    FEATURE_VERSION,
};
use crate::logic::error::PredictionError;

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create a new zeroed feature vector with current version
    pub fn new() -> Self {
        Self::from_values([0.0; FEATURE_COUNT])
    }

    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    pub fn set(&mut self, index: usize, value: f32) {
        if index < FEATURE_COUNT {
            self.values[index] = value;
        }
    }

    /// Validate that this vector is compatible with current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
                .collect::<serde_json::Map<_, _>>(),
        })
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// FEATURE TABLE
// ============================================================================

/// Rows x FEATURE_COUNT table with the layout's column names attached
#[derive(Debug, Clone)]
pub struct FeatureTable {
    columns: &'static [&'static str],
    data: Array2<f32>,
}

impl FeatureTable {
    /// Build a table from layout-checked vectors
    pub fn from_vectors(rows: &[FeatureVector]) -> Result<Self, PredictionError> {
        let mut flat = Vec::with_capacity(rows.len() * FEATURE_COUNT);
        for row in rows {
            row.validate()
                .map_err(|e| PredictionError::Shape(e.to_string()))?;
            flat.extend_from_slice(&row.values);
        }

        let data = Array2::from_shape_vec((rows.len(), FEATURE_COUNT), flat)
            .map_err(|e| PredictionError::Shape(e.to_string()))?;

        Ok(Self {
            columns: FEATURE_LAYOUT,
            data,
        })
    }

    pub fn single(row: &FeatureVector) -> Result<Self, PredictionError> {
        Self::from_vectors(std::slice::from_ref(row))
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> {
        self.data.rows().into_iter()
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_vector_is_current_layout() {
        let v = FeatureVector::new();
        assert!(v.validate().is_ok());
        assert_eq!(v.as_slice().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_stale_vector_rejected_by_table() {
        let mut v = FeatureVector::new();
        v.version = FEATURE_VERSION + 1;
        assert!(matches!(FeatureTable::single(&v), Err(PredictionError::Shape(_))));
    }

    #[test]
    fn test_set_out_of_range_is_ignored() {
        let mut v = FeatureVector::new();
        v.set(FEATURE_COUNT, 9.0);
        assert!(v.as_slice().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_table_shape_and_columns() {
        let a = FeatureVector::from_values([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = FeatureVector::from_values([6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        let table = FeatureTable::from_vectors(&[a, b]).unwrap();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.columns(), FEATURE_LAYOUT);
        assert_eq!(table.data()[[1, 0]], 6.0);
        assert_eq!(table.rows().count(), 2);
        assert_eq!(table.data().shape(), &[2, FEATURE_COUNT]);
    }

    #[test]
    fn test_log_entry_names_values() {
        let v = FeatureVector::from_values([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let entry = v.to_log_entry();
        assert_eq!(entry["named_values"]["DaysActive"], serde_json::json!(5.0));
        assert_eq!(entry["feature_version"], serde_json::json!(FEATURE_VERSION));
    }
}
