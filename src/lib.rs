pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod handlers;
pub mod language;
pub mod localize;
pub mod middleware;
pub mod preferences;
pub mod queue;
pub mod quiz;
pub mod rate_limiter;
pub mod response;
pub mod retry;
pub mod server;
pub mod token_bucket;
pub mod translation;
pub mod tutor;
pub mod validation;

pub use config::{Config, ThrottleSettings};
pub use error::{Error, Result, ServiceError, ServiceErrorKind};
pub use generator::{GenerationOptions, TextGenerator};
pub use handlers::{AppState, SharedState};
pub use language::Language;
pub use server::create_app;
pub use tutor::Tutor;
