//! Target transform
//!
//! The model regresses `log1p(CLV)`. Going back to currency uses `expm1`,
//! never `exp(x) - 1`, which loses most of its digits for small `x`.

use serde::{Deserialize, Serialize};

/// Currency → model target space
pub fn forward_log1p(value: f64) -> f64 {
    value.ln_1p()
}

/// Model output → currency
pub fn inverse_log1p(raw: f64) -> f64 {
    raw.exp_m1()
}

/// What to do when the model output maps to a negative amount (raw < 0)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativePolicy {
    /// Report 0.0 and flag the result
    #[default]
    ClampToZero,
    /// Report the negative amount as is
    Keep,
}

impl NegativePolicy {
    /// Returns the value to report and whether it was changed
    pub fn apply(self, value: f64) -> (f64, bool) {
        match self {
            NegativePolicy::ClampToZero if value < 0.0 => (0.0, true),
            _ => (value, false),
        }
    }
}
