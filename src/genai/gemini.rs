//! Gemini `generateContent` REST client

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{GenerativeBackend, Part};
use crate::config::GenAiConfig;
use crate::{AdvisorError, Result};

const SERVICE: &str = "Gemini";

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl From<Part> for RequestPart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => RequestPart::Text { text },
            Part::Image { mime_type, data } => RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type,
                    data: general_purpose::STANDARD.encode(data),
                },
            },
        }
    }
}

impl GenerateResponse {
    /// Text of the first candidate, with all of its text parts joined
    fn into_text(self) -> Result<String> {
        let first = self
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next();

        let Some(candidate) = first else {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(AdvisorError::upstream(
                    SERVICE,
                    format!("prompt was blocked: {reason}"),
                ));
            }
            return Ok(String::new());
        };

        Ok(candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect())
    }
}

impl GeminiClient {
    pub fn new(config: &GenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AdvisorError::config("Gemini API key is not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("agri-advisor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdvisorError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.trim().to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    #[instrument(skip(self, parts), fields(model = %self.model, parts = parts.len()))]
    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: parts.into_iter().map(RequestPart::from).collect(),
            }],
        };
        let start_time = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdvisorError::upstream(SERVICE, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            warn!("Gemini returned {}: {}", status, message);
            return Err(AdvisorError::upstream(
                SERVICE,
                format!("status {status}: {message}"),
            ));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::upstream(SERVICE, format!("invalid response: {e}")))?;

        let text = payload.into_text()?;
        let total_duration = start_time.elapsed();
        info!(
            "Generated {} chars in {:.3}s",
            text.len(),
            total_duration.as_secs_f64()
        );
        if total_duration.as_secs() > 20 {
            warn!("Slow Gemini response: {:.3}s", total_duration.as_secs_f64());
        }
        debug!("Gemini reply: {}", text);
        Ok(text)
    }
}
