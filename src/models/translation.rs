//! Translation result model

use serde::{Deserialize, Serialize};

/// Language every message passes through before reaching the generative backend
pub const PIVOT_LANGUAGE: &str = "en";

/// Text in the pivot language plus the language it was translated from
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub text: String,
    pub source_lang: String,
}

impl TranslationResult {
    /// Result for text that was not translated
    #[must_use]
    pub fn untranslated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: PIVOT_LANGUAGE.to_string(),
        }
    }

    #[must_use]
    pub fn is_pivot(&self) -> bool {
        self.source_lang == PIVOT_LANGUAGE
    }
}
