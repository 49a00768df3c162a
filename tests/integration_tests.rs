use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use topic_tutor::{
    create_app, AppState, GenerationOptions, ServiceError, TextGenerator, ThrottleSettings, Tutor,
};
use tower::ServiceExt;

const QUIZ_JSON: &str = r#"```json
[
  {"question": "What do plants absorb?", "options": ["Light", "Sound", "Heat", "Noise"], "correct_index": 0, "explanation": "Chlorophyll absorbs light."},
  {"question": "Which gas is released?", "options": ["CO2", "Oxygen", "Helium", "Neon"], "correct_index": 1, "explanation": "Oxygen is a by-product."},
  {"question": "Where does it happen?", "options": ["Roots", "Stem", "Chloroplasts", "Seeds"], "correct_index": 2, "explanation": "Chloroplasts host the reactions."}
]
```"#;

/// Answers by recognising which kind of prompt it was given.
#[derive(Default)]
struct CannedGenerator {
    calls: AtomicUsize,
    fail_translations: bool,
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if prompt.starts_with("Translate the following text") {
            if self.fail_translations {
                return Err(ServiceError::from_message("429 Too Many Requests"));
            }
            let text = prompt.rsplit("\n\n").next().unwrap_or_default();
            return Ok(format!("[id] {}", text));
        }
        if prompt.contains("quiz questions about") {
            return Ok(QUIZ_JSON.to_string());
        }
        if prompt.contains("comprehensive explanation") {
            return Ok("# Photosynthesis\n\nPlants turn light into sugar.".to_string());
        }
        if prompt.contains("detailed analogy") {
            return Ok("<p>A leaf is a tiny kitchen.</p>".to_string());
        }
        Err(ServiceError::rejected("unexpected prompt"))
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

fn test_settings() -> ThrottleSettings {
    ThrottleSettings {
        queue_delay: Duration::from_millis(10),
        max_attempts: 2,
        ..ThrottleSettings::default()
    }
}

fn app_with(generator: Arc<CannedGenerator>) -> Router {
    let settings = test_settings();
    let tutor = Tutor::new(generator, &settings).unwrap();
    create_app(AppState::new(Some(tutor), settings, Duration::from_secs(3600)).shared())
}

fn app_without_generator() -> Router {
    create_app(AppState::new(None, test_settings(), Duration::from_secs(3600)).shared())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn sample_questions() -> Value {
    json!([
        {"question": "Q1?", "options": ["a", "b", "c", "d"], "correct_index": 0, "explanation": "e1"},
        {"question": "Q2?", "options": ["a", "b", "c", "d"], "correct_index": 1, "explanation": "e2"},
        {"question": "Q3?", "options": ["a", "b", "c", "d"], "correct_index": 2, "explanation": "e3"}
    ])
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app_with(Arc::new(CannedGenerator::default()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["generator"], "canned");
    assert_eq!(body["translation"]["pending_jobs"], 0);
    assert_eq!(body["translation"]["settings"]["capacity"], 15);
}

#[tokio::test]
async fn test_health_without_generator_is_degraded() {
    let response = app_without_generator()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert!(body["translation"].is_null());
}

#[tokio::test]
async fn test_generate_content_and_cache() {
    let generator = Arc::new(CannedGenerator::default());
    let app = app_with(generator.clone());

    let response = app
        .clone()
        .oneshot(post_json("/generate-content", json!({"topic": "  Photosynthesis "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["topic"], "Photosynthesis");
    assert!(body["explanation"].as_str().unwrap().starts_with("# Photosynthesis"));
    assert_eq!(body["analogy"], "A leaf is a tiny kitchen.");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

    let response = app
        .oneshot(post_json("/generate-content", json!({"topic": "Photosynthesis"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_generate_content_blank_topic() {
    let app = app_with(Arc::new(CannedGenerator::default()));

    let response = app
        .oneshot(post_json("/generate-content", json!({"topic": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_generate_content_without_generator() {
    let response = app_without_generator()
        .oneshot(post_json("/generate-content", json!({"topic": "Tides"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["error"], "not_initialized");
}

#[tokio::test]
async fn test_generate_quiz_from_form() {
    let app = app_with(Arc::new(CannedGenerator::default()));

    let response = app
        .oneshot(post_form("/generate-quiz", "topic=Photosynthesis&difficulty=hard&language=xx"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[1]["correct_index"], 1);
}

#[tokio::test]
async fn test_generate_quiz_bad_difficulty() {
    let app = app_with(Arc::new(CannedGenerator::default()));

    let response = app
        .oneshot(post_form("/generate-quiz", "topic=Tides&difficulty=impossible"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test(start_paused = true)]
async fn test_translate_through_queue() {
    let app = app_with(Arc::new(CannedGenerator::default()));

    let response = app
        .oneshot(post_json("/translate", json!({"text": "Hello", "language": "id"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["translation"], "[id] Hello");
    assert_eq!(body["language"], "id");
}

#[tokio::test]
async fn test_translate_rejects_unknown_language() {
    let app = app_with(Arc::new(CannedGenerator::default()));

    let response = app
        .oneshot(post_json("/translate", json!({"text": "Hello", "language": "fr"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn test_translate_content_falls_back_to_original() {
    let generator = Arc::new(CannedGenerator {
        fail_translations: true,
        ..CannedGenerator::default()
    });
    let app = app_with(generator);

    let lesson = json!({"topic": "Tides", "explanation": "The moon pulls.", "analogy": "A tug of war."});
    let response = app
        .oneshot(post_json("/translate-content", json!({"content": lesson, "language": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["fallback"], true);
    assert_eq!(body["language"], "en");
    assert_eq!(body["content"]["explanation"], "The moon pulls.");
}

#[tokio::test(start_paused = true)]
async fn test_translate_quiz() {
    let app = app_with(Arc::new(CannedGenerator::default()));

    let response = app
        .oneshot(post_json(
            "/translate-quiz",
            json!({"questions": sample_questions(), "language": "id"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["questions"][0]["question"], "[id] Q1?");
    assert_eq!(body["questions"][2]["options"][3], "[id] d");
    assert_eq!(body["questions"][2]["correct_index"], 2);
}

#[tokio::test]
async fn test_score_quiz_without_generator() {
    let answers = json!([
        {"question_index": 0, "selected_option": 0},
        {"question_index": 1, "selected_option": 1},
        {"question_index": 2, "selected_option": 3}
    ]);

    let response = app_without_generator()
        .oneshot(post_json(
            "/quiz/score",
            json!({"questions": sample_questions(), "answers": answers}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["score"], 2);
    assert_eq!(body["total_questions"], 3);
    assert_eq!(body["percentage"], 66.67);
    assert_eq!(body["feedback"], "Good effort! You're on the right track.");
}

#[tokio::test]
async fn test_score_quiz_rejects_malformed_question() {
    let questions = json!([
        {"question": "", "options": ["a", "b", "c", "d"], "correct_index": 9, "explanation": ""}
    ]);

    let response = app_without_generator()
        .oneshot(post_json(
            "/quiz/score",
            json!({"questions": questions, "answers": [{"question_index": 0, "selected_option": 0}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("questions[0].correct_index"));
}

#[tokio::test]
async fn test_translate_quiz_rejects_malformed_question() {
    let generator = Arc::new(CannedGenerator::default());
    let app = app_with(generator.clone());

    let questions = json!([
        {"question": "Q1?", "options": ["a", "b", "c", "d"], "correct_index": 4, "explanation": "e"}
    ]);
    let response = app
        .oneshot(post_json("/translate-quiz", json!({"questions": questions, "language": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_translate_content_rejects_blank_sections() {
    let generator = Arc::new(CannedGenerator::default());
    let app = app_with(generator.clone());

    let lesson = json!({"topic": "Tides", "explanation": "The moon pulls.", "analogy": "  "});
    let response = app
        .oneshot(post_json("/translate-content", json!({"content": lesson, "language": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("content.analogy"));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_score_quiz_incomplete() {
    let response = app_without_generator()
        .oneshot(post_json(
            "/quiz/score",
            json!({"questions": sample_questions(), "answers": [{"question_index": 0, "selected_option": 0}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_request_id_header() {
    let app = app_without_generator();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-42");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
