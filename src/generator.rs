use async_trait::async_trait;
use serde::Serialize;

use crate::error::ServiceError;

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationOptions {
    /// Explanations, analogies and quizzes
    pub const CONTENT: GenerationOptions = GenerationOptions {
        temperature: 0.7,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 1024,
    };

    pub const TRANSLATION: GenerationOptions = GenerationOptions {
        temperature: 0.3,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 1024,
    };
}

/// A remote text-completion service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`, or report a classified failure.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ServiceError>;

    fn name(&self) -> &'static str;
}
