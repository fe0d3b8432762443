//! Cross-language text bridge
//!
//! Chat messages are moved into the pivot language before they reach the
//! generative backend and moved back into the user's language afterwards.
//! Translation is best effort: when the backend fails the text passes through
//! untranslated and the conversation carries on.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::Result;
use crate::models::{PIVOT_LANGUAGE, TranslationResult};

pub mod google;

pub use google::GoogleTranslateClient;

/// Language detection and translation backend
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Detect the language of `text`, returning a language code such as `hi`
    async fn detect(&self, text: &str) -> Result<String>;

    /// Translate `text` into `target_lang`
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}

/// Whether a language code denotes the pivot language (`en`, `en-US`, ...)
#[must_use]
pub fn is_pivot(lang: &str) -> bool {
    lang.split(['-', '_'])
        .next()
        .is_some_and(|primary| primary.eq_ignore_ascii_case(PIVOT_LANGUAGE))
}

pub struct TextBridge {
    backend: Arc<dyn TranslationBackend>,
}

impl TextBridge {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    /// Translate `text` into the pivot language, remembering its source language
    pub async fn to_pivot(&self, text: &str) -> TranslationResult {
        if text.trim().is_empty() {
            return TranslationResult::untranslated(text);
        }

        let source_lang = match self.backend.detect(text).await {
            Ok(lang) => lang,
            Err(e) => {
                warn!("Language detection failed, continuing untranslated: {}", e);
                return TranslationResult::untranslated(text);
            }
        };

        if is_pivot(&source_lang) {
            debug!("Message already in pivot language");
            return TranslationResult::untranslated(text);
        }

        match self.backend.translate(text, PIVOT_LANGUAGE).await {
            Ok(translated) => {
                debug!("Translated message from '{}'", source_lang);
                TranslationResult {
                    text: translated,
                    source_lang,
                }
            }
            Err(e) => {
                warn!(
                    "Translation from '{}' failed, continuing untranslated: {}",
                    source_lang, e
                );
                TranslationResult::untranslated(text)
            }
        }
    }

    /// Translate pivot-language `text` back into `target_lang`
    pub async fn from_pivot(&self, text: &str, target_lang: &str) -> String {
        if is_pivot(target_lang) || text.trim().is_empty() {
            return text.to_string();
        }

        match self.backend.translate(text, target_lang).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(
                    "Translation to '{}' failed, replying untranslated: {}",
                    target_lang, e
                );
                text.to_string()
            }
        }
    }
}
