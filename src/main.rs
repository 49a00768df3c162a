use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::net::SocketAddr;
use topic_tutor::config::Config;
use topic_tutor::handlers::AppState;
use topic_tutor::language::Language;
use topic_tutor::localize::localize_lesson;
use topic_tutor::preferences::{PreferenceStore, Theme};
use topic_tutor::quiz::Difficulty;
use topic_tutor::response::LocalizedLessonResponse;
use topic_tutor::server::Server;
use topic_tutor::Tutor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "topic-tutor", version, about = "Explanations, analogies and quizzes for any topic")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Explanation and analogy for a topic
    Learn {
        topic: String,
        #[arg(long, default_value = "en")]
        language: String,
    },
    /// Multiple-choice quiz for a topic
    Quiz {
        topic: String,
        #[arg(long, default_value = "medium")]
        difficulty: String,
        #[arg(long, default_value = "en")]
        language: String,
    },
    /// Translate text through the throttled queue
    Translate {
        text: String,
        #[arg(long)]
        to: String,
    },
    /// Stored preferences
    #[command(name = "config")]
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    SetKey { api_key: String },
    ClearKey,
    /// Set the theme, or toggle it when none is given
    Theme { theme: Option<String> },
    Show,
}

#[derive(Serialize)]
struct PreferencesView {
    path: String,
    theme: Theme,
    api_key_set: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("topic_tutor={},tower_http=debug", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut store = PreferenceStore::open(config.preferences_path.clone())
        .with_context(|| format!("Failed to read preferences at {}", config.preferences_path.display()))?;

    match cli.command {
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config, &store).await
        }
        Command::Learn { topic, language } => {
            let language: Language = language.parse()?;
            let tutor = Tutor::from_config(&config, store.get())?;
            let lesson = tutor.content().generate_lesson(&topic).await?;

            let response = match localize_lesson(tutor.queue(), &lesson, language).await {
                Ok(translated) => LocalizedLessonResponse::translated(translated, language),
                Err(e) => {
                    tracing::warn!(error = %e, "Translation failed, showing the English lesson");
                    LocalizedLessonResponse::original(lesson)
                }
            };
            print_json(&response)
        }
        Command::Quiz {
            topic,
            difficulty,
            language,
        } => {
            let difficulty: Difficulty = difficulty.parse()?;
            let language = Language::from_code_lenient(&language);
            let tutor = Tutor::from_config(&config, store.get())?;
            let quiz = tutor.content().generate_quiz(&topic, difficulty, language).await?;
            print_json(&quiz)
        }
        Command::Translate { text, to } => {
            let language: Language = to.parse()?;
            let tutor = Tutor::from_config(&config, store.get())?;
            let translation = tutor.queue().translate(text, language).await?;
            println!("{}", translation);
            Ok(())
        }
        Command::Prefs { action } => {
            match action {
                PrefsAction::SetKey { api_key } => store.set_api_key(&api_key)?,
                PrefsAction::ClearKey => store.clear_api_key()?,
                PrefsAction::Theme { theme: Some(theme) } => store.set_theme(theme.parse()?)?,
                PrefsAction::Theme { theme: None } => {
                    store.toggle_theme()?;
                }
                PrefsAction::Show => {}
            }
            print_json(&PreferencesView {
                path: store.path().display().to_string(),
                theme: store.get().theme,
                api_key_set: store.get().api_key.is_some(),
            })
        }
    }
}

async fn serve(config: Config, store: &PreferenceStore) -> Result<()> {
    tracing::info!("Starting topic tutor service");
    tracing::info!(
        "Configuration: bind_addr={}, model={}, burst={}, rate_per_minute={}",
        config.bind_addr,
        config.model,
        config.translation_burst,
        config.translation_rate_per_minute
    );

    let tutor = match Tutor::from_config(&config, store.get()) {
        Ok(tutor) => Some(tutor),
        Err(e) => {
            tracing::warn!("Generator unavailable, content endpoints will return 503: {}", e);
            None
        }
    };

    let state = AppState::new(tutor, config.throttle(), config.content_cache_ttl()).shared();

    Server::new(&config, state)
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
