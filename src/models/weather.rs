//! Weather snapshot model and display methods

use serde::{Deserialize, Serialize};

/// Current conditions for one location, valid for a single request
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Location name as requested by the caller
    pub location: String,
    /// Temperature in Celsius
    pub temperature_c: f64,
    /// Relative humidity percentage (0-100)
    pub humidity_pct: f64,
    /// Wind speed in km/h
    pub wind_kph: f64,
    /// Chance of rain today (0-100)
    pub rain_chance_pct: f64,
    /// Human-readable description of today's forecast
    pub condition_text: String,
}

impl WeatherSnapshot {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.temperature_c)
    }

    #[must_use]
    pub fn format_humidity(&self) -> String {
        format!("{:.0}%", self.humidity_pct)
    }

    #[must_use]
    pub fn format_wind(&self) -> String {
        format!("{:.1} km/h", self.wind_kph)
    }

    #[must_use]
    pub fn format_rain_chance(&self) -> String {
        format!("{:.0}%", self.rain_chance_pct)
    }

    /// Build the display form returned to API callers
    #[must_use]
    pub fn to_report(&self) -> WeatherReport {
        WeatherReport {
            location: self.location.clone(),
            temperature: self.format_temperature(),
            humidity: self.format_humidity(),
            wind_speed: self.format_wind(),
            rain_chance: self.format_rain_chance(),
            forecast: self.condition_text.clone(),
        }
    }
}

/// Display strings for a snapshot, keyed the way the frontend expects them
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReport {
    #[serde(rename = "Current Weather in")]
    pub location: String,
    pub temperature: String,
    pub humidity: String,
    #[serde(rename = "windSpeed")]
    pub wind_speed: String,
    #[serde(rename = "rainChance")]
    pub rain_chance: String,
    pub forecast: String,
}
