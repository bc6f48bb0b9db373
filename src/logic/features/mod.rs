//! Features Module - Feature Schema & Record Assembly
//!
//! Turns customer attributes into a model row.
//! The column layout lives in one place (`layout.rs`) and nowhere else.

pub mod layout;
pub mod record;
pub mod segment;
pub mod vector;


// Re-export common types
pub use layout::{LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use record::FeatureRecord;
pub use segment::{CustomerSegment, SEGMENT_LABELS};
pub use vector::{FeatureTable, FeatureVector};
