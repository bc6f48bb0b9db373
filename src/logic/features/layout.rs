//! Feature Layout - Centralized Feature Definition
//!
//! **CRITICAL: This file controls the feature schema the CLV model was trained on**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Rename feature → increment FEATURE_VERSION
//!
//! The tree ensemble looks features up by position. A reordered row does not
//! fail, it silently scores garbage.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the model input row
/// This is the SINGLE SOURCE OF TRUTH for feature layout
pub const FEATURE_LAYOUT: &[&str] = &[
    "Recency",       // 0: Days since last purchase
    "Frequency",     // 1: Number of purchases
    "Cluster",       // 2: Customer segment id (0-3)
    "AvgOrderValue", // 3: Average order value
    "DaysActive",    // 4: Days between first and last purchase
    "Quantity",      // 5: Total quantity purchased
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 6;

/// Column indices, kept next to the layout so they move together
pub const IDX_RECENCY: usize = 0;
pub const IDX_FREQUENCY: usize = 1;
pub const IDX_CLUSTER: usize = 2;
pub const IDX_AVG_ORDER_VALUE: usize = 3;
pub const IDX_DAYS_ACTIVE: usize = 4;
pub const IDX_QUANTITY: usize = 5;

// ============================================================================
// FEATURE DOMAINS
// ============================================================================

/// Declared input domain of a feature (inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureDomain {
    pub min: f64,
    pub max: f64,
    pub integer: bool,
}

impl FeatureDomain {
    const fn int(min: f64, max: f64) -> Self {
        Self { min, max, integer: true }
    }

    const fn float(min: f64, max: f64) -> Self {
        Self { min, max, integer: false }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Domains in layout order
pub const FEATURE_DOMAINS: [FeatureDomain; FEATURE_COUNT] = [
    FeatureDomain::int(0.0, 365.0),        // Recency
    FeatureDomain::int(1.0, 100.0),        // Frequency
    FeatureDomain::int(0.0, 3.0),          // Cluster
    FeatureDomain::float(0.0, 10_000.0),   // AvgOrderValue
    FeatureDomain::int(0.0, 365.0),        // DaysActive
    FeatureDomain::int(1.0, 1000.0),       // Quantity
];

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
/// Used to detect layout mismatches between the trained model and this build
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when feature layout doesn't match expected
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "Feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Validate that incoming data matches current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

/// Compare an externally supplied ordered name list (model artifact, sidecar)
/// with the layout. Returns the first position that differs.
pub fn first_name_mismatch<S: AsRef<str>>(names: &[S]) -> Option<usize> {
    if names.len() != FEATURE_COUNT {
        return Some(names.len().min(FEATURE_COUNT));
    }
    names
        .iter()
        .zip(FEATURE_LAYOUT.iter())
        .position(|(given, expected)| given.as_ref() != *expected)
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_COUNT, 6);
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
        assert_eq!(FEATURE_DOMAINS.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_index_constants_match_layout() {
        assert_eq!(feature_index("Recency"), Some(IDX_RECENCY));
        assert_eq!(feature_index("Frequency"), Some(IDX_FREQUENCY));
        assert_eq!(feature_index("Cluster"), Some(IDX_CLUSTER));
        assert_eq!(feature_index("AvgOrderValue"), Some(IDX_AVG_ORDER_VALUE));
        assert_eq!(feature_index("DaysActive"), Some(IDX_DAYS_ACTIVE));
        assert_eq!(feature_index("Quantity"), Some(IDX_QUANTITY));
        assert_eq!(feature_index("recency"), None);
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(compute_layout_hash(), compute_layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
        assert!(validate_layout(FEATURE_VERSION + 1, layout_hash()).is_err());
        assert!(validate_layout(FEATURE_VERSION, layout_hash().wrapping_add(1)).is_err());
    }

    #[test]
    fn test_first_name_mismatch() {
        assert_eq!(first_name_mismatch(FEATURE_LAYOUT), None);

        let swapped = ["Frequency", "Recency", "Cluster", "AvgOrderValue", "DaysActive", "Quantity"];
        assert_eq!(first_name_mismatch(&swapped), Some(0));

        let short = ["Recency", "Frequency"];
        assert_eq!(first_name_mismatch(&short), Some(2));
    }

    #[test]
    fn test_domains() {
        let recency = FEATURE_DOMAINS[IDX_RECENCY];
        assert!(recency.contains(0.0));
        assert!(recency.contains(365.0));
        assert!(!recency.contains(366.0));
        assert_eq!(recency.clamp(-5.0), 0.0);

        let aov = FEATURE_DOMAINS[IDX_AVG_ORDER_VALUE];
        assert!(!aov.integer);
        assert_eq!(aov.clamp(20_000.0), 10_000.0);
    }

    #[test]
    fn test_layout_info() {
        let info = LayoutInfo::current();
        assert_eq!(info.version, FEATURE_VERSION);
        assert_eq!(info.feature_count, FEATURE_COUNT);
        assert_eq!(info.feature_names[3], "AvgOrderValue");
    }
}
