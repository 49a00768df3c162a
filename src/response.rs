use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::ThrottleSettings;
use crate::content::LearningContent;
use crate::language::Language;
use crate::quiz::QuizQuestion;

#[derive(Debug, Serialize, Deserialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translation: String,
    pub language: Language,
}

/// A lesson in the language actually delivered. When translation fails the
/// original comes back with `language` reset to English and `fallback` set.
#[derive(Debug, Serialize, Deserialize)]
pub struct LocalizedLessonResponse {
    pub content: LearningContent,
    pub language: Language,
    pub fallback: bool,
}

impl LocalizedLessonResponse {
    pub fn translated(content: LearningContent, language: Language) -> Self {
        Self {
            content,
            language,
            fallback: false,
        }
    }

    pub fn original(content: LearningContent) -> Self {
        Self {
            content,
            language: Language::English,
            fallback: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslationStatus {
    pub pending_jobs: usize,
    pub cached_translations: usize,
    pub available_tokens: f64,
    pub settings: ThrottleSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub generator: Option<String>,
    pub translation: Option<TranslationStatus>,
}

impl HealthResponse {
    pub fn new(uptime_seconds: u64, generator: Option<String>, translation: Option<TranslationStatus>) -> Self {
        let status = if generator.is_some() { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds,
            generator,
            translation,
        }
    }
}
