//! Feature record scored by the price model

use serde::{Deserialize, Serialize};

/// Column names the price model was trained on, in column order
pub const FEATURE_NAMES: [&str; 3] = ["DayOfYear", "Min Price", "Max Price"];

/// A single row of model input
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PriceFeatureRow {
    /// Day of the year (1-366)
    pub day_of_year: u16,
    /// Lowest market price observed
    pub min_price: f64,
    /// Highest market price observed
    pub max_price: f64,
}

impl PriceFeatureRow {
    /// Feature values in [`FEATURE_NAMES`] order
    #[must_use]
    pub fn as_features(&self) -> [f64; 3] {
        [f64::from(self.day_of_year), self.min_price, self.max_price]
    }
}
