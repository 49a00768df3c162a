use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Credential for the Gemini API; falls back to the preferences file
    #[envconfig(from = "GEMINI_API_KEY")]
    pub api_key: Option<String>,

    #[envconfig(from = "GEMINI_MODEL", default = "gemini-2.0-flash")]
    pub model: String,

    #[envconfig(from = "GEMINI_BASE_URL", default = "https://generativelanguage.googleapis.com")]
    pub base_url: String,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Token bucket capacity for outbound translation calls
    #[envconfig(from = "TRANSLATION_BURST", default = "15")]
    pub translation_burst: u32,

    /// Token bucket refill, in tokens per minute
    #[envconfig(from = "TRANSLATION_RATE_PER_MINUTE", default = "15")]
    pub translation_rate_per_minute: u32,

    /// Pause between two queued translation jobs
    #[envconfig(from = "QUEUE_DELAY_MS", default = "1000")]
    pub queue_delay_ms: u64,

    /// Attempt budget for both retry loops
    #[envconfig(from = "MAX_ATTEMPTS", default = "3")]
    pub max_attempts: u32,

    /// 0 keeps every translation for the life of the process
    #[envconfig(from = "TRANSLATION_CACHE_CAPACITY", default = "0")]
    pub translation_cache_capacity: usize,

    #[envconfig(from = "CONTENT_CACHE_TTL_SECS", default = "3600")]
    pub content_cache_ttl_secs: u64,

    #[envconfig(from = "PREFERENCES_PATH", default = ".topic-tutor.json")]
    pub preferences_path: PathBuf,

    #[envconfig(from = "REQUEST_TIMEOUT_SECS", default = "60")]
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }

    pub fn throttle(&self) -> ThrottleSettings {
        ThrottleSettings {
            capacity: self.translation_burst,
            refill_per_minute: self.translation_rate_per_minute,
            queue_delay: Duration::from_millis(self.queue_delay_ms),
            max_attempts: self.max_attempts,
            cache_capacity: self.translation_cache_capacity,
        }
    }

    pub fn content_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.content_cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            log_level: "info".to_string(),
            translation_burst: 15,
            translation_rate_per_minute: 15,
            queue_delay_ms: 1000,
            max_attempts: 3,
            translation_cache_capacity: 0,
            content_cache_ttl_secs: 3600,
            preferences_path: PathBuf::from(".topic-tutor.json"),
            request_timeout_secs: 60,
        }
    }
}

/// Knobs of the translation pipeline: bucket, queue pacing, retries and cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleSettings {
    pub capacity: u32,
    pub refill_per_minute: u32,
    #[serde(with = "humantime_serde")]
    pub queue_delay: Duration,
    pub max_attempts: u32,
    pub cache_capacity: usize,
}

impl ThrottleSettings {
    pub fn refill_per_second(&self) -> f64 {
        self.refill_per_minute as f64 / 60.0
    }
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Config::default().throttle()
    }
}
