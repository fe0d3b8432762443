//! `agri-advisor` - Agricultural advisory backend
//!
//! Combines a weather provider, a generative-language model, a translation
//! service and a crop price regression model behind one HTTP API.

pub mod advisory;
pub mod api;
pub mod artifact;
pub mod chat;
pub mod config;
pub mod error;
pub mod genai;
pub mod models;
pub mod prediction;
pub mod telemetry;
pub mod translation;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use advisory::Advisor;
pub use api::AppState;
pub use artifact::{ArtifactFetcher, ArtifactLocator, ArtifactProvisioner, HttpArtifactFetcher};
pub use chat::ChatService;
pub use config::AdvisorConfig;
pub use error::{AdvisorError, ErrorCode};
pub use genai::{GeminiClient, GenerativeBackend, Part};
pub use models::{PriceFeatureRow, TranslationResult, WeatherReport, WeatherSnapshot};
pub use prediction::{FileModelSource, ModelCache, PricePredictor, RegressionModel};
pub use translation::{GoogleTranslateClient, TextBridge, TranslationBackend};
pub use weather::{WeatherApiClient, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AdvisorError>;
