use std::sync::Arc;
use tracing::info;

use crate::config::{Config, ThrottleSettings};
use crate::content::ContentGenerator;
use crate::error::{Error, Result};
use crate::gemini::GeminiClient;
use crate::generator::TextGenerator;
use crate::preferences::Preferences;
use crate::queue::TranslationQueue;
use crate::translation::Translator;

/// Everything that talks to the generator, wired together once.
///
/// Content generation goes straight to the generator; translation goes
/// through the queue, limiter and cache owned here.
#[derive(Clone)]
pub struct Tutor {
    content: ContentGenerator,
    translator: Arc<Translator>,
    queue: TranslationQueue,
}

impl Tutor {
    /// Must be called from within a tokio runtime: spawns the queue worker.
    pub fn new(generator: Arc<dyn TextGenerator>, settings: &ThrottleSettings) -> Result<Self> {
        let translator = Arc::new(Translator::from_settings(generator.clone(), settings)?);
        let queue = TranslationQueue::spawn(translator.clone(), settings.queue_delay);

        Ok(Self {
            content: ContentGenerator::new(generator, settings.max_attempts),
            translator,
            queue,
        })
    }

    /// Build a Gemini-backed tutor, or `NotInitialized` without a credential.
    pub fn from_config(config: &Config, preferences: &Preferences) -> Result<Self> {
        let api_key = resolve_api_key(config, preferences).ok_or(Error::NotInitialized)?;
        let client = GeminiClient::new(api_key, &config.model, &config.base_url, config.request_timeout())?;

        info!(model = %config.model, "Gemini generator configured");
        Self::new(Arc::new(client), &config.throttle())
    }

    pub fn content(&self) -> &ContentGenerator {
        &self.content
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn queue(&self) -> &TranslationQueue {
        &self.queue
    }
}

/// Environment wins over the stored credential.
pub fn resolve_api_key(config: &Config, preferences: &Preferences) -> Option<String> {
    config
        .api_key
        .as_deref()
        .or(preferences.api_key.as_deref())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}
