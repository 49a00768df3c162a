use crate::config::Config;
use crate::handlers::{
    generate_content, generate_quiz, health_check, score_quiz, translate, translate_content,
    translate_quiz, SharedState,
};
use crate::middleware::request_logging;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_app(state: SharedState) -> Router {
    Router::new()
        // Content endpoints
        .route("/generate-content", post(generate_content))
        .route("/generate-quiz", post(generate_quiz))
        .route("/quiz/score", post(score_quiz))
        // Translation endpoints
        .route("/translate", post(translate))
        .route("/translate-content", post(translate_content))
        .route("/translate-quiz", post(translate_quiz))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_logging)),
        )
}

pub struct Server {
    app: Router,
    state: SharedState,
    bind_addr: SocketAddr,
    purge_interval: Duration,
}

impl Server {
    pub fn new(config: &Config, state: SharedState) -> Self {
        Self {
            app: create_app(state.clone()),
            state,
            bind_addr: config.bind_addr,
            purge_interval: config.content_cache_ttl(),
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("Topic tutor listening on {}", self.bind_addr);
        tracing::info!("Health check available at /health");

        let purger = tokio::spawn(purge_caches(self.state.clone(), self.purge_interval));

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        purger.abort();
        Ok(())
    }
}

async fn purge_caches(state: SharedState, every: Duration) {
    if every.is_zero() {
        return;
    }
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        let removed = state.purge_expired().await;
        if removed > 0 {
            tracing::debug!(removed, "Purged expired content cache entries");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
