use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{info, instrument};
use validator::Validate;

use crate::error::{Error, Result};
use crate::generator::{GenerationOptions, TextGenerator};
use crate::language::Language;
use crate::quiz::{parse_quiz_response, Difficulty, QuizData, QUESTIONS_PER_QUIZ};
use crate::retry::RetryPolicy;
use crate::validation::not_blank;

/// Explanation and analogy for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LearningContent {
    pub topic: String,
    #[validate(custom(function = "not_blank"))]
    pub explanation: String,
    #[validate(custom(function = "not_blank"))]
    pub analogy: String,
}

const TUTOR_PREAMBLE: &str = "\
You are a patient, rigorous tutor. Work through each request systematically:
understand what is being asked, break the subject into its core ideas, connect
them to things the learner already knows, and present the result clearly and
accurately. Acknowledge uncertainty where it exists and adapt depth to a
curious non-specialist.";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid pattern"));
static README_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s*README\.md\s*$").expect("valid pattern"));
static CRAMPED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#+)([^#\s])").expect("valid pattern"));
static LIST_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*][ \t]+(\S)").expect("valid pattern"));
static EMPTY_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```\s*```").expect("valid pattern"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid pattern"));

/// Clean up model markdown: drop HTML tags and README headings, put a space
/// after heading hashes, normalise bullets and collapse blank-line runs.
pub fn tidy_markdown(content: &str) -> String {
    let content = HTML_TAG.replace_all(content, "");
    let content = README_HEADING.replace_all(&content, "");
    let content = CRAMPED_HEADING.replace_all(&content, "$1 $2");
    let content = LIST_BULLET.replace_all(&content, "- $1");
    let content = EMPTY_FENCE.replace_all(&content, "");
    let content = BLANK_RUN.replace_all(&content, "\n\n");
    content.trim().to_string()
}

pub fn explanation_prompt(topic: &str) -> String {
    format!(
        "Provide a comprehensive explanation of {topic}. Include:
- Key concepts and principles
- How it works or functions
- Its significance or importance
- Real-world applications

Format your response in clean markdown with proper headings, bullet points, and paragraphs.
Do NOT use code blocks or pre-formatted text unless specifically needed for the topic.
Do NOT include any HTML tags.
Keep it informative but accessible.
Start with a main heading using # {topic}"
    )
}

pub fn analogy_prompt(topic: &str) -> String {
    format!(
        "Create a detailed analogy that relates {topic} to a real-world scenario.
The analogy should:
- Compare {topic} to something familiar from everyday life
- Highlight key aspects and mechanisms of {topic}
- Be engaging, memorable, and educational
- Help someone understand complex concepts through familiar examples

Format your response in markdown with a clear structure.
Start with a heading like \"# Understanding {topic} Through Analogy\"
Use subheadings to organize different aspects of the comparison.
Keep it detailed but accessible."
    )
}

pub fn quiz_prompt(topic: &str, difficulty: Difficulty, language: Language) -> String {
    format!(
        "Create {count} quiz questions about {topic} at a {difficulty} difficulty level {instruction}.

For each question:
- Provide a clear, focused question that tests understanding
- Include exactly 4 possible answers
- Make sure only one answer is correct
- Provide a brief explanation for why the correct answer is right
- Questions should test comprehension, not just memorization

Return ONLY a valid JSON array in this exact format:
[
  {{
    \"question\": \"Question text here?\",
    \"options\": [\"Option A\", \"Option B\", \"Option C\", \"Option D\"],
    \"correct_index\": 0,
    \"explanation\": \"Brief explanation of why this answer is correct\"
  }}
]

IMPORTANT:
- Return ONLY the JSON array, no other text or formatting
- All text (questions, options, and explanations) must be in the specified language
- For Hinglish, use a natural mix of Hindi (in Roman script) and English words
- For Hindi, use proper Devanagari script",
        count = QUESTIONS_PER_QUIZ,
        instruction = language.instruction(),
    )
}

fn wrap_query(prompt: &str) -> String {
    format!(
        "{}\n\nQuery: {}\n\nDo not show the thinking steps in the response.",
        TUTOR_PREAMBLE, prompt
    )
}

fn require_topic(topic: &str) -> Result<&str> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(Error::Validation("Please enter a topic to learn about.".to_string()));
    }
    Ok(topic)
}

/// Talks to the generator directly: no rate limiter, no cache, linear retry.
#[derive(Clone)]
pub struct ContentGenerator {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl ContentGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, max_attempts: u32) -> Self {
        Self {
            generator,
            policy: RetryPolicy::content(max_attempts),
        }
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    /// One prompt through the retry loop.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let query = wrap_query(prompt);
        let generator = &self.generator;
        let query = query.as_str();

        self.policy
            .run("generate", move |_| async move {
                generator.generate(query, &GenerationOptions::CONTENT).await
            })
            .await
            .map_err(|exhausted| Error::GenerationFailed {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })
    }

    #[instrument(skip(self))]
    pub async fn generate_explanation(&self, topic: &str) -> Result<String> {
        let topic = require_topic(topic)?;
        let raw = self.generate(&explanation_prompt(topic)).await?;

        let content = tidy_markdown(&raw);
        if content.starts_with("# ") {
            Ok(content)
        } else {
            Ok(format!("# Understanding {}\n\n{}", topic, content))
        }
    }

    #[instrument(skip(self))]
    pub async fn generate_analogy(&self, topic: &str) -> Result<String> {
        let topic = require_topic(topic)?;
        let raw = self.generate(&analogy_prompt(topic)).await?;
        Ok(tidy_markdown(&raw))
    }

    /// Explanation and analogy, requested concurrently; both must succeed.
    pub async fn generate_lesson(&self, topic: &str) -> Result<LearningContent> {
        let topic = require_topic(topic)?;
        let (explanation, analogy) =
            tokio::join!(self.generate_explanation(topic), self.generate_analogy(topic));

        let content = LearningContent {
            topic: topic.to_string(),
            explanation: explanation?,
            analogy: analogy?,
        };
        info!(topic = %content.topic, "Generated lesson");
        Ok(content)
    }

    #[instrument(skip(self))]
    pub async fn generate_quiz(&self, topic: &str, difficulty: Difficulty, language: Language) -> Result<QuizData> {
        let topic = require_topic(topic)?;
        let response = self.generate(&quiz_prompt(topic, difficulty, language)).await?;
        let quiz = parse_quiz_response(&response)?;

        info!(questions = quiz.questions.len(), "Generated quiz");
        Ok(quiz)
    }
}
