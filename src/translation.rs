use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::TranslationCache;
use crate::config::ThrottleSettings;
use crate::error::{Error, Result};
use crate::generator::{GenerationOptions, TextGenerator};
use crate::language::Language;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;

pub fn translation_prompt(text: &str, language: Language) -> String {
    format!(
        "Translate the following text to {}. Maintain the markdown formatting and structure. \
         Only return the translated text without any additional explanations or notes:\n\n{}",
        language.name(),
        text
    )
}

/// Cached, rate-limited, retrying translation of single strings.
///
/// Holds its own bucket and cache; build one per process (or per test).
pub struct Translator {
    generator: Arc<dyn TextGenerator>,
    limiter: RateLimiter,
    cache: Mutex<TranslationCache>,
    policy: RetryPolicy,
}

impl Translator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        limiter: RateLimiter,
        cache: TranslationCache,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            limiter,
            cache: Mutex::new(cache),
            policy,
        }
    }

    pub fn from_settings(generator: Arc<dyn TextGenerator>, settings: &ThrottleSettings) -> Result<Self> {
        Ok(Self::new(
            generator,
            RateLimiter::from_settings(settings)?,
            TranslationCache::with_capacity(settings.cache_capacity),
            RetryPolicy::translation(settings.max_attempts),
        ))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Translate with the configured attempt budget.
    pub async fn translate(&self, text: &str, language: Language) -> Result<String> {
        self.translate_with_retry(text, language, self.policy.max_attempts).await
    }

    /// Cache first, then token-gated remote calls under the retry policy.
    pub async fn translate_with_retry(&self, text: &str, language: Language, max_attempts: u32) -> Result<String> {
        if let Some(hit) = self.cache.lock().await.get(text, language) {
            debug!(language = language.code(), "Translation cache hit");
            return Ok(hit);
        }

        let prompt = translation_prompt(text, language);
        let policy = RetryPolicy {
            max_attempts,
            ..self.policy
        };

        let this = self;
        let prompt = prompt.as_str();
        let translated = policy
            .run("translate", move |_| async move {
                let waited = this.limiter.acquire().await;
                if !waited.is_zero() {
                    debug!(waited_ms = waited.as_millis() as u64, "Waited for rate limiter");
                }
                this.generator
                    .generate(prompt, &GenerationOptions::TRANSLATION)
                    .await
            })
            .await
            .map_err(|exhausted| Error::TranslationFailed {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })?;

        info!(
            language = language.code(),
            chars = text.chars().count(),
            "Translated text"
        );
        self.cache.lock().await.put(text, language, translated.clone());
        Ok(translated)
    }
}
