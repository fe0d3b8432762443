//! Data models for the advisory service
//!
//! This module contains the request-scoped domain models organized by concern:
//! - Weather: current conditions snapshot and its display form
//! - Price: the single-row feature record scored by the price model
//! - Translation: text moved into and out of the pivot language

pub mod price;
pub mod translation;
pub mod weather;

// Re-export all public types for convenient access
pub use price::{FEATURE_NAMES, PriceFeatureRow};
pub use translation::{PIVOT_LANGUAGE, TranslationResult};
pub use weather::{WeatherReport, WeatherSnapshot};
