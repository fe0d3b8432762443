//! Weather provider integration

use async_trait::async_trait;

use crate::Result;
use crate::models::WeatherSnapshot;

pub mod weatherapi;

pub use weatherapi::WeatherApiClient;

/// Source of current conditions for a named location
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_conditions(&self, location: &str) -> Result<WeatherSnapshot>;
}
