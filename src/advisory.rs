//! Advisory orchestration
//!
//! Builds prompts for the farming capabilities and hands them to the
//! generative backend. Replies are returned as unstructured prose; nothing
//! here tries to parse what the model wrote.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::genai::{GenerativeBackend, Part};
use crate::{AdvisorError, Result};

/// Reply used when the backend has nothing to say about the weather
pub const NO_WEATHER_PREDICTION: &str = "No weather data available.";

/// Language used when the caller does not ask for one
pub const DEFAULT_LANGUAGE: &str = "English";

pub struct Advisor {
    generator: Arc<dyn GenerativeBackend>,
}

impl Advisor {
    pub fn new(generator: Arc<dyn GenerativeBackend>) -> Self {
        Self { generator }
    }

    /// Farming advice for the given weather, returned verbatim
    #[instrument(skip(self, weather_summary))]
    pub async fn farming_insight(
        &self,
        location: &str,
        weather_summary: &Value,
        language: &str,
    ) -> Result<String> {
        let prompt = insight_prompt(location, weather_summary, language_or_default(language));
        let text = self.generator.generate(vec![Part::text(prompt)]).await?;
        require_text(text)
    }

    /// Disease analysis of a crop photo
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    pub async fn analyze_crop_image(&self, image: &[u8], language: &str) -> Result<String> {
        if image.is_empty() {
            return Err(AdvisorError::missing_input("No file uploaded"));
        }

        let owned = image.to_vec();
        let jpeg = tokio::task::spawn_blocking(move || normalize_image(&owned))
            .await
            .map_err(|e| AdvisorError::analysis(format!("image task failed: {e}")))??;
        debug!("Normalized image to {} JPEG bytes", jpeg.len());

        let prompt = format!(
            "Analyze this crop image and detect any diseases. Provide recommendations in {}.",
            language_or_default(language)
        );

        let text = self
            .generator
            .generate(vec![Part::jpeg(jpeg), Part::text(prompt)])
            .await
            .map_err(|e| AdvisorError::analysis(e.to_string()))?;

        if text.is_empty() {
            return Err(AdvisorError::analysis("model returned no analysis"));
        }
        Ok(text)
    }

    /// Three day weather outlook in prose
    #[instrument(skip(self))]
    pub async fn weather_narrative(&self, location: &str) -> Result<String> {
        let location = location.trim();
        if location.is_empty() {
            return Err(AdvisorError::missing_input("City name is required"));
        }

        let prompt = format!("Predict the weather for {location} for the next 3 days.");
        let text = self.generator.generate(vec![Part::text(prompt)]).await?;

        let text = text.trim();
        if text.is_empty() {
            warn!("No narrative generated for '{}', using fallback", location);
            return Ok(NO_WEATHER_PREDICTION.to_string());
        }
        info!("Generated weather narrative for '{}'", location);
        Ok(text.to_string())
    }
}

fn language_or_default(language: &str) -> &str {
    let language = language.trim();
    if language.is_empty() {
        DEFAULT_LANGUAGE
    } else {
        language
    }
}

fn require_text(text: String) -> Result<String> {
    if text.is_empty() {
        return Err(AdvisorError::upstream("Gemini", "model returned no text"));
    }
    Ok(text)
}

fn insight_prompt(location: &str, weather_summary: &Value, language: &str) -> String {
    let weather = match weather_summary {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };

    format!(
        "Analyze this weather data for {location} and provide farming-specific insights in {language}:\n\
         1. Best farming practices based on temperature, humidity, and rainfall.\n\
         2. Irrigation techniques for optimal water use.\n\
         3. Pest and disease risks under these conditions.\n\
         4. Weather-related farming risks such as drought or heat stress.\n\
         \n\
         Weather Data:\n\
         {weather}\n"
    )
}

/// Decode any supported image format and re-encode it as RGB JPEG
pub fn normalize_image(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| AdvisorError::analysis(format!("unreadable image: {e}")))?;

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| AdvisorError::analysis(format!("failed to encode image: {e}")))?;
    Ok(out.into_inner())
}
