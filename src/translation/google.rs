//! Google Translate client using the public `translate_a/single` endpoint

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::TranslationBackend;
use crate::config::TranslationConfig;
use crate::{AdvisorError, Result};

const SERVICE: &str = "Translate";

pub struct GoogleTranslateClient {
    client: Client,
    base_url: String,
}

impl GoogleTranslateClient {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("agri-advisor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdvisorError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// One round trip returning `(translated text, detected source language)`
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn translate_raw(&self, text: &str, target_lang: &str) -> Result<(String, String)> {
        let url = format!(
            "{}/translate_a/single?client=gtx&sl=auto&tl={}&dt=t&q={}",
            self.base_url,
            urlencoding::encode(target_lang),
            urlencoding::encode(text)
        );
        let start_time = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                AdvisorError::upstream(SERVICE, format!("request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisorError::upstream(
                SERVICE,
                format!("request failed with status {status}"),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| {
                AdvisorError::upstream(SERVICE, format!("invalid response: {}", e.without_url()))
            })?;

        debug!(
            "Translate call finished in {:.3}s",
            start_time.elapsed().as_secs_f64()
        );
        parse_response(&body)
    }
}

/// Extract the translation and detected language from the nested array
/// response: `[[["translated", "original", ...], ...], null, "src", ...]`.
fn parse_response(body: &Value) -> Result<(String, String)> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| AdvisorError::upstream(SERVICE, "response has no translation segments"))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    let source_lang = body
        .get(2)
        .and_then(Value::as_str)
        .ok_or_else(|| AdvisorError::upstream(SERVICE, "response has no detected language"))?
        .to_string();

    Ok((translated, source_lang))
}

#[async_trait]
impl TranslationBackend for GoogleTranslateClient {
    async fn detect(&self, text: &str) -> Result<String> {
        let (_, source_lang) = self.translate_raw(text, "en").await?;
        Ok(source_lang)
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let (translated, _) = self.translate_raw(text, target_lang).await?;
        Ok(translated)
    }
}
