//! Conversational orchestration
//!
//! A chat turn goes user language -> pivot -> model -> user language. The
//! translation legs are best effort; only the model call can fail the turn.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::genai::{GenerativeBackend, Part};
use crate::translation::TextBridge;
use crate::{AdvisorError, Result};

pub struct ChatService {
    bridge: Arc<TextBridge>,
    generator: Arc<dyn GenerativeBackend>,
}

impl ChatService {
    pub fn new(bridge: Arc<TextBridge>, generator: Arc<dyn GenerativeBackend>) -> Self {
        Self { bridge, generator }
    }

    /// Answer one message in the language it was written in
    #[instrument(skip(self, message), fields(chars = message.len()))]
    pub async fn chat(&self, message: &str) -> Result<String> {
        if message.trim().is_empty() {
            return Err(AdvisorError::missing_input("Message is required"));
        }

        let pivot = self.bridge.to_pivot(message).await;
        let reply = self.generator.generate(vec![Part::text(pivot.text.as_str())]).await?;
        if reply.is_empty() {
            return Err(AdvisorError::upstream("Gemini", "model returned no text"));
        }

        let answer = self.bridge.from_pivot(&reply, &pivot.source_lang).await;
        info!("Answered chat message (language '{}')", pivot.source_lang);
        Ok(answer)
    }
}
