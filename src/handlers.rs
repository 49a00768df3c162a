use axum::extract::State;
use axum::{Form, Json};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};
use validator::Validate;

use crate::cache::TimedCache;
use crate::config::ThrottleSettings;
use crate::content::LearningContent;
use crate::error::{Error, Result};
use crate::language::Language;
use crate::localize::{localize_lesson, localize_quiz};
use crate::quiz::{score_answers, Difficulty, QuizAnswer, QuizData, QuizQuestion, QuizResult};
use crate::response::{
    HealthResponse, LocalizedLessonResponse, QuizResponse, TranslateResponse, TranslationStatus,
};
use crate::tutor::Tutor;
use crate::validation::{not_blank, validate_request};

/// Shared application state
pub type SharedState = Arc<AppState>;

type QuizKey = (String, Difficulty, Language);

/// The tutor (absent until a credential is configured) plus response caches
/// for the legacy endpoints.
pub struct AppState {
    tutor: Option<Tutor>,
    settings: ThrottleSettings,
    lessons: Mutex<TimedCache<String, LearningContent>>,
    quizzes: Mutex<TimedCache<QuizKey, QuizData>>,
    started_at: Instant,
}

impl AppState {
    pub fn new(tutor: Option<Tutor>, settings: ThrottleSettings, content_ttl: Duration) -> Self {
        Self {
            tutor,
            settings,
            lessons: Mutex::new(TimedCache::new(content_ttl)),
            quizzes: Mutex::new(TimedCache::new(content_ttl)),
            started_at: Instant::now(),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    pub fn tutor(&self) -> Result<&Tutor> {
        self.tutor.as_ref().ok_or(Error::NotInitialized)
    }

    /// Drop stale lesson and quiz responses.
    pub async fn purge_expired(&self) -> usize {
        let lessons = self.lessons.lock().await.purge_expired();
        let quizzes = self.quizzes.lock().await.purge_expired();
        lessons + quizzes
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LearnRequest {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub topic: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QuizForm {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TranslateRequest {
    #[validate(custom(function = "not_blank"), length(max = 20000))]
    pub text: String,
    pub language: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TranslateContentRequest {
    #[validate(nested)]
    pub content: LearningContent,
    pub language: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TranslateQuizRequest {
    #[validate(length(min = 1), nested)]
    pub questions: Vec<QuizQuestion>,
    pub language: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScoreRequest {
    #[validate(length(min = 1), nested)]
    pub questions: Vec<QuizQuestion>,
    pub answers: Vec<QuizAnswer>,
}

/// Explanation and analogy for a topic
pub async fn generate_content(
    State(state): State<SharedState>,
    Json(payload): Json<LearnRequest>,
) -> Result<Json<LearningContent>> {
    validate_request(&payload)?;
    let tutor = state.tutor()?;
    let topic = payload.topic.trim().to_string();

    if let Some(cached) = state.lessons.lock().await.get(&topic) {
        info!(topic = %topic, "Serving cached lesson");
        return Ok(Json(cached));
    }

    let lesson = tutor.content().generate_lesson(&topic).await?;
    state.lessons.lock().await.insert(topic, lesson.clone());

    Ok(Json(lesson))
}

/// Quiz for a topic, from form fields `topic`, `difficulty` and `language`
pub async fn generate_quiz(
    State(state): State<SharedState>,
    Form(form): Form<QuizForm>,
) -> Result<Json<QuizResponse>> {
    validate_request(&form)?;
    let tutor = state.tutor()?;

    let difficulty = match form.difficulty.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse()?,
        _ => Difficulty::default(),
    };
    let language = form
        .language
        .as_deref()
        .map(Language::from_code_lenient)
        .unwrap_or_default();
    let key = (form.topic.trim().to_string(), difficulty, language);

    if let Some(cached) = state.quizzes.lock().await.get(&key) {
        info!(topic = %key.0, "Serving cached quiz");
        return Ok(Json(QuizResponse {
            questions: cached.questions,
        }));
    }

    let quiz = tutor.content().generate_quiz(&key.0, difficulty, language).await?;
    state.quizzes.lock().await.insert(key, quiz.clone());

    Ok(Json(QuizResponse {
        questions: quiz.questions,
    }))
}

/// Single string through the throttled translation queue
pub async fn translate(
    State(state): State<SharedState>,
    Json(payload): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>> {
    validate_request(&payload)?;
    let language: Language = payload.language.parse()?;
    let tutor = state.tutor()?;

    let translation = tutor.queue().translate(payload.text, language).await?;

    Ok(Json(TranslateResponse {
        translation,
        language,
    }))
}

/// Whole lesson; on failure the original comes back marked as a fallback
pub async fn translate_content(
    State(state): State<SharedState>,
    Json(payload): Json<TranslateContentRequest>,
) -> Result<Json<LocalizedLessonResponse>> {
    validate_request(&payload)?;
    let language: Language = payload.language.parse()?;
    let tutor = state.tutor()?;

    match localize_lesson(tutor.queue(), &payload.content, language).await {
        Ok(translated) => Ok(Json(LocalizedLessonResponse::translated(translated, language))),
        Err(e) => {
            warn!(language = language.code(), error = %e, "Lesson translation failed, returning original");
            Ok(Json(LocalizedLessonResponse::original(payload.content)))
        }
    }
}

/// Whole quiz, question by question
pub async fn translate_quiz(
    State(state): State<SharedState>,
    Json(payload): Json<TranslateQuizRequest>,
) -> Result<Json<QuizResponse>> {
    validate_request(&payload)?;
    let language: Language = payload.language.parse()?;
    let tutor = state.tutor()?;

    let quiz = QuizData {
        questions: payload.questions,
    };
    let translated = localize_quiz(tutor.queue(), &quiz, language).await;

    Ok(Json(QuizResponse {
        questions: translated.questions,
    }))
}

/// Score submitted answers; needs no generator
pub async fn score_quiz(Json(payload): Json<ScoreRequest>) -> Result<Json<QuizResult>> {
    validate_request(&payload)?;
    let quiz = QuizData {
        questions: payload.questions,
    };
    Ok(Json(score_answers(&quiz, &payload.answers)?))
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime = state.started_at.elapsed().as_secs();

    let (generator, translation) = match state.tutor.as_ref() {
        Some(tutor) => {
            let translator = tutor.translator();
            let status = TranslationStatus {
                pending_jobs: tutor.queue().pending(),
                cached_translations: translator.cached_entries().await,
                available_tokens: translator.limiter().available_tokens().await,
                settings: state.settings.clone(),
            };
            (Some(tutor.content().generator_name().to_string()), Some(status))
        }
        None => (None, None),
    };

    Json(HealthResponse::new(uptime, generator, translation))
}
