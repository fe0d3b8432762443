//! Generative-language backend
//!
//! Prompts are sent as a list of parts so a single call can carry both text
//! and an image.

use async_trait::async_trait;

use crate::Result;

pub mod gemini;

pub use gemini::GeminiClient;

/// One piece of prompt content
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    #[must_use]
    pub fn jpeg(data: Vec<u8>) -> Self {
        Part::Image {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generate a reply to `parts`.
    ///
    /// Returns an empty string when the model answered without any text.
    async fn generate(&self, parts: Vec<Part>) -> Result<String>;
}
