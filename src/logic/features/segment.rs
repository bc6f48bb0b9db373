//! Customer Segment - label lookup for the form layer
//!
//! The clustering step of the training pipeline produced four segments.
//! The model only sees the integer id; the labels are what the form shows.

use serde::{Deserialize, Serialize};

use crate::logic::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CustomerSegment {
    LowValue = 0,
    LostOrDormant = 1,
    HighValue = 2,
    PotentialLoyalist = 3,
}

/// Fixed label → id table, in display order
pub const SEGMENT_LABELS: [(&str, CustomerSegment); 4] = [
    ("0 - Low Value (infrequent, low spenders)", CustomerSegment::LowValue),
    ("1 - Lost or Dormant", CustomerSegment::LostOrDormant),
    ("2 - High Value (frequent + high spenders)", CustomerSegment::HighValue),
    ("3 - Potential Loyalists", CustomerSegment::PotentialLoyalist),
];

impl CustomerSegment {
    pub const ALL: [CustomerSegment; 4] = [
        CustomerSegment::LowValue,
        CustomerSegment::LostOrDormant,
        CustomerSegment::HighValue,
        CustomerSegment::PotentialLoyalist,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn label(self) -> &'static str {
        SEGMENT_LABELS[self as usize].0
    }

    pub fn from_label(label: &str) -> Option<Self> {
        SEGMENT_LABELS
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, segment)| *segment)
    }
}

impl TryFrom<u8> for CustomerSegment {
    type Error = SchemaError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(SchemaError::UnknownSegment(i64::from(id)))
    }
}

impl From<CustomerSegment> for u8 {
    fn from(segment: CustomerSegment) -> Self {
        segment.id()
    }
}

impl std::fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
