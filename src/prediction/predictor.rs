use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::cache::ModelCache;
use crate::models::PriceFeatureRow;
use crate::{AdvisorError, Result};

/// Raw prediction request fields.
///
/// Clients send numbers either as JSON numbers or numeric strings, so the
/// fields stay untyped until [`PriceInput::to_row`] validates them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceInput {
    #[serde(rename = "dayOfYear")]
    pub day_of_year: Option<Value>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<Value>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<Value>,
}

impl PriceInput {
    pub fn to_row(&self) -> Result<PriceFeatureRow> {
        let day_of_year = parse_integer("dayOfYear", self.day_of_year.as_ref())?;
        let min_price = parse_float("minPrice", self.min_price.as_ref())?;
        let max_price = parse_float("maxPrice", self.max_price.as_ref())?;
        build_row(day_of_year, min_price, max_price)
    }
}

fn parse_integer(field: &str, value: Option<&Value>) -> Result<i64> {
    let invalid =
        || AdvisorError::invalid_input(format!("'{field}' must be an integer, got {}", show(value)));

    match value {
        None | Some(Value::Null) => Err(missing(field)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(i),
            // 100.0 and 100.7 both mean day 100
            None => n
                .as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
                .ok_or_else(invalid),
        },
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn parse_float(field: &str, value: Option<&Value>) -> Result<f64> {
    let invalid =
        || AdvisorError::invalid_input(format!("'{field}' must be a number, got {}", show(value)));

    let parsed = match value {
        None | Some(Value::Null) => return Err(missing(field)),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed.filter(|f| f.is_finite()).ok_or_else(invalid)
}

fn missing(field: &str) -> AdvisorError {
    AdvisorError::invalid_input(format!("'{field}' is required"))
}

fn show(value: Option<&Value>) -> String {
    value.map_or_else(|| "nothing".to_string(), Value::to_string)
}

fn build_row(day_of_year: i64, min_price: f64, max_price: f64) -> Result<PriceFeatureRow> {
    if !(1..=366).contains(&day_of_year) {
        return Err(AdvisorError::invalid_input(format!(
            "'dayOfYear' must be between 1 and 366, got {day_of_year}"
        )));
    }
    if !min_price.is_finite() || !max_price.is_finite() {
        return Err(AdvisorError::invalid_input(
            "'minPrice' and 'maxPrice' must be finite numbers",
        ));
    }
    if min_price > max_price {
        warn!(
            "minPrice {} exceeds maxPrice {}; scoring anyway",
            min_price, max_price
        );
    }

    Ok(PriceFeatureRow {
        day_of_year: day_of_year as u16,
        min_price,
        max_price,
    })
}

/// Round to two decimal places, resolving exact ties to the even cent
#[must_use]
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Scores validated price requests against the cached model
pub struct PricePredictor {
    cache: Arc<ModelCache>,
}

impl PricePredictor {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }

    /// Predict a price rounded to two decimal places
    #[instrument(skip(self))]
    pub async fn predict_price(
        &self,
        day_of_year: i64,
        min_price: f64,
        max_price: f64,
    ) -> Result<f64> {
        let row = build_row(day_of_year, min_price, max_price)?;
        self.predict_row(&row).await
    }

    /// Validate raw request fields and predict
    pub async fn predict_input(&self, input: &PriceInput) -> Result<f64> {
        let row = input.to_row()?;
        self.predict_row(&row).await
    }

    async fn predict_row(&self, row: &PriceFeatureRow) -> Result<f64> {
        let model = self.cache.get_model().await?;
        let raw = model.predict(row);

        if !raw.is_finite() {
            return Err(AdvisorError::prediction(format!(
                "model produced a non-finite value for {row:?}"
            )));
        }

        let price = round_price(raw);
        debug!("Predicted price {} (raw {})", price, raw);
        Ok(price)
    }
}
