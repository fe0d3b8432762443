//! Weather API client for WeatherAPI.com integration
//!
//! Reads current conditions and today's forecast from the `forecast.json`
//! endpoint and converts them into a [`WeatherSnapshot`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::WeatherProvider;
use crate::config::WeatherConfig;
use crate::models::WeatherSnapshot;
use crate::{AdvisorError, Result};

const SERVICE: &str = "WeatherAPI";

/// WeatherAPI.com response structures
mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub current: CurrentData,
        pub forecast: ForecastData,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentData {
        pub temp_c: f64,
        pub humidity: f64,
        pub wind_kph: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastData {
        pub forecastday: Vec<ForecastDay>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastDay {
        pub day: DayData,
    }

    #[derive(Debug, Deserialize)]
    pub struct DayData {
        pub daily_chance_of_rain: f64,
        pub condition: Condition,
    }

    #[derive(Debug, Deserialize)]
    pub struct Condition {
        pub text: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorResponse {
        pub error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorDetail {
        pub code: Option<u32>,
        pub message: String,
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiResponse {
    Error(wire::ErrorResponse),
    Forecast(wire::ForecastResponse),
}

pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AdvisorError::config("Weather API key is not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("agri-advisor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdvisorError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    #[instrument(skip(self))]
    async fn current_conditions(&self, location: &str) -> Result<WeatherSnapshot> {
        let location = location.trim();
        if location.is_empty() {
            return Err(AdvisorError::missing_input("City name is required"));
        }

        info!("Getting weather for '{}'", location);
        let start_time = Instant::now();

        let url = format!(
            "{}/forecast.json?key={}&q={}&days=1",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(location)
        );

        // The URL carries the API key; keep it out of errors and logs
        let response = self.client.get(&url).send().await.map_err(|e| {
            let e = e.without_url();
            warn!("Network error fetching weather: {}", e);
            AdvisorError::upstream(SERVICE, format!("request failed: {e}"))
        })?;

        let status = response.status();
        debug!("HTTP response received: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| {
                AdvisorError::upstream(
                    SERVICE,
                    format!("failed to read body: {}", e.without_url()),
                )
            })?;

        let snapshot = parse_forecast(location, status, &body)?;

        info!(
            "Retrieved weather for '{}' in {:.3}s",
            location,
            start_time.elapsed().as_secs_f64()
        );
        Ok(snapshot)
    }
}

fn parse_forecast(location: &str, status: StatusCode, body: &str) -> Result<WeatherSnapshot> {
    let parsed: ApiResponse = serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse weather response: {}", e);
        AdvisorError::upstream(SERVICE, format!("invalid weather data (status {status})"))
    })?;

    match parsed {
        ApiResponse::Error(err) => {
            let code = err.error.code.unwrap_or_default();
            warn!(
                "Weather provider rejected '{}' (code {}): {}",
                location, code, err.error.message
            );
            // Key/quota problems are ours to fix, not the caller's
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                Err(AdvisorError::upstream(SERVICE, err.error.message))
            } else {
                Err(AdvisorError::weather_unavailable(err.error.message))
            }
        }
        ApiResponse::Forecast(forecast) => {
            let today = forecast.forecast.forecastday.into_iter().next().ok_or_else(|| {
                AdvisorError::upstream(SERVICE, "forecast contained no days")
            })?;

            Ok(WeatherSnapshot {
                location: location.to_string(),
                temperature_c: forecast.current.temp_c,
                humidity_pct: forecast.current.humidity,
                wind_kph: forecast.current.wind_kph,
                rain_chance_pct: today.day.daily_chance_of_rain,
                condition_text: today.day.condition.text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST_BODY: &str = r#"{
        "location": {"name": "Pune", "country": "India"},
        "current": {"temp_c": 29.0, "humidity": 62, "wind_kph": 14.4, "condition": {"text": "Partly cloudy"}},
        "forecast": {"forecastday": [
            {"date": "2026-10-18", "day": {"maxtemp_c": 31.2, "daily_chance_of_rain": 75, "condition": {"text": "Moderate rain"}}}
        ]}
    }"#;

    #[test]
    fn test_parse_forecast() {
        let snapshot = parse_forecast("Pune", StatusCode::OK, FORECAST_BODY).unwrap();
        assert_eq!(snapshot.location, "Pune");
        assert_eq!(snapshot.temperature_c, 29.0);
        assert_eq!(snapshot.humidity_pct, 62.0);
        assert_eq!(snapshot.rain_chance_pct, 75.0);
        assert_eq!(snapshot.condition_text, "Moderate rain");
        assert_eq!(snapshot.format_temperature(), "29.0°C");
    }

    #[test]
    fn test_unknown_location_is_client_error() {
        let body = r#"{"error": {"code": 1006, "message": "No matching location found."}}"#;
        let err = parse_forecast("Atlantis", StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, AdvisorError::WeatherUnavailable { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_rejected_key_is_upstream_error() {
        let body = r#"{"error": {"code": 2006, "message": "API key is invalid."}}"#;
        let err = parse_forecast("Pune", StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(matches!(err, AdvisorError::Upstream { .. }));
    }

    #[test]
    fn test_malformed_body_is_upstream_error() {
        let err = parse_forecast("Pune", StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert!(matches!(err, AdvisorError::Upstream { .. }));

        let err = parse_forecast("Pune", StatusCode::OK, r#"{"current": {}}"#).unwrap_err();
        assert!(matches!(err, AdvisorError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_blank_location_rejected_before_request() {
        let config = WeatherConfig {
            api_key: Some("weather_key_123".to_string()),
            // unroutable; the request must never be sent
            base_url: "http://127.0.0.1:9".to_string(),
            ..WeatherConfig::default()
        };
        let client = WeatherApiClient::new(&config).unwrap();
        let err = client.current_conditions("  ").await.unwrap_err();
        assert!(matches!(err, AdvisorError::MissingInput { .. }));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_api_key() {
        let config = WeatherConfig {
            api_key: Some("SUPERSECRETKEY".to_string()),
            // nothing listens on the discard port
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 5,
        };
        let client = WeatherApiClient::new(&config).unwrap();

        let err = client.current_conditions("Pune").await.unwrap_err();
        assert!(matches!(err, AdvisorError::Upstream { .. }));
        assert!(!err.user_message().contains("SUPERSECRETKEY"));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));
        assert!(!format!("{err:?}").contains("SUPERSECRETKEY"));
    }
}
